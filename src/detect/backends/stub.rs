use std::collections::VecDeque;

use anyhow::Result;

use crate::detect::backend::{DetectionParams, FaceDetector};
use crate::detect::result::Region;
use crate::frame::GrayImage;

/// Minimum peak intensity for the threshold mode to report a patch.
const PATCH_THRESHOLD: u8 = 200;

/// Stub backend for tests and synthetic runs.
///
/// Two modes:
/// - scripted: returns queued region lists, one per call, then empty lists;
/// - threshold: reports the bounding box of the brightest pixels as a single
///   face, provided the peak reaches `PATCH_THRESHOLD`.
pub struct StubDetector {
    mode: StubMode,
    calls: u64,
}

enum StubMode {
    Scripted(VecDeque<Vec<Region>>),
    Threshold,
}

impl StubDetector {
    /// Detector that replays `script`, one entry per `detect` call.
    pub fn scripted(script: impl IntoIterator<Item = Vec<Region>>) -> Self {
        Self {
            mode: StubMode::Scripted(script.into_iter().collect()),
            calls: 0,
        }
    }

    /// Detector that finds the bright patch drawn by the synthetic source.
    pub fn threshold() -> Self {
        Self {
            mode: StubMode::Threshold,
            calls: 0,
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Default for StubDetector {
    fn default() -> Self {
        Self::threshold()
    }
}

impl FaceDetector for StubDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, image: &GrayImage, params: &DetectionParams) -> Result<Vec<Region>> {
        self.calls += 1;
        match &mut self.mode {
            StubMode::Scripted(script) => Ok(script.pop_front().unwrap_or_default()),
            StubMode::Threshold => Ok(bright_patch(image)
                .filter(|r| r.width >= params.min_size && r.height >= params.min_size)
                .into_iter()
                .collect()),
        }
    }
}

fn bright_patch(image: &GrayImage) -> Option<Region> {
    let peak = image.as_bytes().iter().copied().max()?;
    if peak < PATCH_THRESHOLD {
        return None;
    }

    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut found = false;

    for y in 0..image.height() {
        for x in 0..image.width() {
            if image.get(x, y) == peak {
                found = true;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
    }

    found.then(|| {
        Region::new(
            min_x as i32,
            min_y as i32,
            (max_x - min_x + 1) as i32,
            (max_y - min_y + 1) as i32,
        )
    })
}
