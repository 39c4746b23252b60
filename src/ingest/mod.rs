//! Frame sources.
//!
//! Video acquisition is an external collaborator. A source hands out `RawFrame`s on
//! demand and may report that no frame is ready yet (camera still starting, stream
//! stalled). "Not ready" is `Ok(None)`, never an error.
//!
//! - `SyntheticSource`: generated frames for `stub://` URLs (tests, demos)

pub mod synthetic;

use anyhow::Result;

use crate::frame::RawFrame;

pub use synthetic::{SyntheticConfig, SyntheticSource};

/// Supplier of frames for the evaluation loop.
pub trait FrameSource {
    /// Return the current frame, or `None` when no frame is ready.
    fn next_frame(&mut self) -> Result<Option<RawFrame>>;

    fn is_healthy(&self) -> bool {
        true
    }
}
