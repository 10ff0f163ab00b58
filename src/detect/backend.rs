use anyhow::Result;

use crate::detect::result::Region;
use crate::frame::GrayImage;

/// Multi-scale scan factor.
pub const DEFAULT_SCALE_FACTOR: f64 = 1.05;
/// Overlapping raw hits required before a region is accepted.
pub const DEFAULT_MIN_NEIGHBORS: i32 = 8;
/// Smallest accepted region side, in pixels.
pub const DEFAULT_MIN_SIZE: i32 = 50;

/// Tunables passed to every detection call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionParams {
    /// Image pyramid step between scans. Must be greater than 1.
    pub scale_factor: f64,
    /// Precision/recall trade-off: higher values reject more candidates.
    pub min_neighbors: i32,
    /// Minimum region width and height.
    pub min_size: i32,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            min_size: DEFAULT_MIN_SIZE,
        }
    }
}

/// Face detector capability.
///
/// The detection algorithm is opaque to the measurement loop. Region order is
/// whatever the backend returns and is not guaranteed to be stable.
pub trait FaceDetector {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Locate faces in a preprocessed single-channel image.
    fn detect(&mut self, image: &GrayImage, params: &DetectionParams) -> Result<Vec<Region>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<D: FaceDetector + ?Sized> FaceDetector for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&mut self, image: &GrayImage, params: &DetectionParams) -> Result<Vec<Region>> {
        (**self).detect(image, params)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
