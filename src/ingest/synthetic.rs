//! Synthetic frame source.
//!
//! `stub://` sources render a dim, noisy background with one bright
//! face-sized patch in the middle. The patch width sweeps back and forth so
//! the estimated distance changes over the session. Output is deterministic
//! for a given configuration.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{CaptureError, FrameSource, SourceConfig, SourceStats};
use crate::frame::{Frame, BGR_CHANNELS};

const BACKGROUND: u8 = 60;
const NOISE: i16 = 12;
const PATCH: [u8; 3] = [230, 235, 240];
/// Frames for a full narrow-wide-narrow sweep.
const SWEEP_PERIOD: u64 = 120;

pub struct SyntheticSource {
    config: SourceConfig,
    frame_count: u64,
    rng: StdRng,
}

impl SyntheticSource {
    pub fn new(config: SourceConfig) -> Self {
        let seed = config
            .uri
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325u64, |acc, b| {
                (acc ^ b as u64).wrapping_mul(0x0100_0000_01b3)
            });
        log::info!("SyntheticSource: connected to {} (synthetic)", config.uri);
        Self {
            config,
            frame_count: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Patch width for a frame: a triangle wave between a quarter and a half
    /// of the frame height.
    pub fn patch_width(&self, frame_index: u64) -> u32 {
        let min = (self.config.height / 4).max(1);
        let max = (self.config.height / 2).max(min);
        let half = SWEEP_PERIOD / 2;
        let phase = frame_index % SWEEP_PERIOD;
        let t = if phase < half { phase } else { SWEEP_PERIOD - phase };
        min + ((max - min) as u64 * t / half) as u32
    }

    fn render(&mut self) -> Vec<u8> {
        let width = self.config.width;
        let height = self.config.height;
        let mut pixels = vec![0u8; width as usize * height as usize * BGR_CHANNELS];
        for px in pixels.chunks_exact_mut(BGR_CHANNELS) {
            let jitter = self.rng.gen_range(-NOISE..=NOISE);
            let value = (BACKGROUND as i16 + jitter).clamp(0, 255) as u8;
            px.copy_from_slice(&[value, value, value]);
        }

        let patch_w = self.patch_width(self.frame_count).min(width);
        let patch_h = (patch_w + patch_w / 4).min(height);
        let left = (width - patch_w) / 2;
        let top = (height - patch_h) / 2;
        for y in top..top + patch_h {
            for x in left..left + patch_w {
                let idx = (y as usize * width as usize + x as usize) * BGR_CHANNELS;
                pixels[idx..idx + BGR_CHANNELS].copy_from_slice(&PATCH);
            }
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        if self.frame_count >= self.config.frames {
            return Err(CaptureError::EndOfStream {
                frames: self.frame_count,
            });
        }
        let pixels = self.render();
        self.frame_count += 1;
        Ok(Frame::from_bgr(
            pixels,
            self.config.width,
            self.config.height,
            self.frame_count,
        )?)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            uri: self.config.uri.clone(),
        }
    }
}
