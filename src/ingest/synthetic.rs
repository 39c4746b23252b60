//! Synthetic frame source.
//!
//! Produces generated RGB frames for `stub://` URLs. Used by the daemon when no
//! real camera is wired in, and by tests that need a deterministic source.
//!
//! The source can imitate a camera that is still starting up (`warmup_polls`) and
//! can switch resolution mid-stream (`set_resolution`), which exercises per-frame
//! ROI scaling.

use anyhow::{anyhow, Result};

use super::FrameSource;
use crate::frame::RawFrame;

/// Configuration for a synthetic source.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    /// Must start with `stub://`.
    pub url: String,
    pub width: u32,
    pub height: u32,
    /// Number of initial polls that report "not ready".
    pub warmup_polls: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            url: "stub://camera".to_string(),
            width: 640,
            height: 480,
            warmup_polls: 0,
        }
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    polls: u64,
    frame_count: u64,
    scene_state: u8,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Result<Self> {
        if !config.url.starts_with("stub://") {
            return Err(anyhow!(
                "synthetic source only serves stub:// urls, got {}",
                config.url
            ));
        }
        if config.width == 0 || config.height == 0 {
            return Err(anyhow!(
                "synthetic source dimensions must be non-zero ({}x{})",
                config.width,
                config.height
            ));
        }
        Ok(Self {
            config,
            polls: 0,
            frame_count: 0,
            scene_state: 0,
        })
    }

    pub fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticSource: connected to {} ({}x{})",
            self.config.url,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    /// Change the output resolution for subsequent frames.
    pub fn set_resolution(&mut self, width: u32, height: u32) {
        log::info!(
            "SyntheticSource: resolution {}x{} -> {}x{}",
            self.config.width,
            self.config.height,
            width,
            height
        );
        self.config.width = width;
        self.config.height = height;
    }

    pub fn frames_captured(&self) -> u64 {
        self.frame_count
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn generate_synthetic_pixels(&mut self) -> Vec<u8> {
        let pixel_count = (self.config.width as usize) * (self.config.height as usize) * 3;

        if self.frame_count.is_multiple_of(50) {
            self.scene_state = self.scene_state.wrapping_add(1);
        }

        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        self.polls += 1;
        if self.polls <= self.config.warmup_polls {
            return Ok(None);
        }

        self.frame_count += 1;
        let pixels = self.generate_synthetic_pixels();
        Ok(Some(RawFrame::new(
            pixels,
            self.config.width,
            self.config.height,
            self.frame_count,
        )))
    }
}
