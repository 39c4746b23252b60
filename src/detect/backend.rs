use anyhow::Result;

use crate::detect::result::DetectedObject;

/// Detector backend trait.
///
/// # Contract
///
/// - `detect` may block for as long as inference takes; the monitor never calls it
///   twice concurrently.
/// - The pixel slice is read-only and must not be retained past the call.
/// - Boxes are reported in pixel coordinates of the frame that was passed in.
/// - An `Err` means "detector unavailable for this frame". The monitor treats it as
///   a skipped tick, not a fatal error.
pub trait DetectorBackend: Send {
    /// Backend identifier, used in logs.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<DetectedObject>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
