//! Frame handles handed from the frame source to the monitor.
//!
//! - `RawFrame`: owns pixel data. Bytes are private; only dimensions are public.
//! - `InferenceView`: what an evaluation works with. It exposes dimensions and can
//!   run a detector, which receives the pixels internally.

use anyhow::Result;

use crate::detect::{DetectedObject, DetectorBackend};

/// One captured frame. No `Clone`, no byte accessor.
pub struct RawFrame {
    data: Vec<u8>,

    /// Pixel dimensions at capture time.
    pub width: u32,
    pub height: u32,

    /// Monotonic sequence number assigned by the source.
    pub seq: u64,
}

impl RawFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, seq: u64) -> Self {
        Self {
            data,
            width,
            height,
            seq,
        }
    }

    pub fn inference_view(&self) -> InferenceView<'_> {
        InferenceView { frame: self }
    }

    #[cfg(test)]
    pub(crate) fn byte_len(&self) -> usize {
        self.data.len()
    }
}

/// Restricted view of a frame for a single evaluation.
pub struct InferenceView<'a> {
    frame: &'a RawFrame,
}

impl<'a> InferenceView<'a> {
    pub fn width(&self) -> u32 {
        self.frame.width
    }

    pub fn height(&self) -> u32 {
        self.frame.height
    }

    pub fn seq(&self) -> u64 {
        self.frame.seq
    }

    /// Run a detector over this frame's pixels.
    ///
    /// The slice lives only for the duration of the call.
    pub fn run_detector(&self, detector: &mut dyn DetectorBackend) -> Result<Vec<DetectedObject>> {
        detector.detect(&self.frame.data, self.frame.width, self.frame.height)
    }
}
