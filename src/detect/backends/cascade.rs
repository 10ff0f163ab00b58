use std::path::Path;

use anyhow::{anyhow, Context, Result};
use opencv::{
    core::{self, Mat, Rect, Scalar, Size, Vector},
    objdetect::CascadeClassifier,
    prelude::*,
};

use crate::detect::backend::{DetectionParams, FaceDetector};
use crate::detect::result::Region;
use crate::frame::GrayImage;

/// OpenCV Haar cascade backend.
///
/// The classifier model is read once in [`CascadeDetector::load`]; detection
/// calls only copy the gray image into a `Mat` and run `detectMultiScale`.
pub struct CascadeDetector {
    classifier: CascadeClassifier,
    scratch: Mat,
}

impl CascadeDetector {
    pub fn load(path: &Path) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("cascade path is not valid UTF-8: {}", path.display()))?;
        if !path.exists() {
            return Err(anyhow!("cascade model not found at {}", path.display()));
        }
        let classifier = CascadeClassifier::new(path_str)
            .with_context(|| format!("failed to load cascade {}", path.display()))?;
        if classifier.empty()? {
            return Err(anyhow!("cascade model {} is empty", path.display()));
        }
        log::info!("CascadeDetector: loaded {}", path.display());
        Ok(Self {
            classifier,
            scratch: Mat::default(),
        })
    }

    fn upload(&mut self, image: &GrayImage) -> Result<()> {
        let rows = image.height() as i32;
        let cols = image.width() as i32;
        let size = self.scratch.size()?;
        if size.width != cols || size.height != rows || self.scratch.typ() != core::CV_8UC1 {
            self.scratch =
                Mat::new_rows_cols_with_default(rows, cols, core::CV_8UC1, Scalar::all(0.0))?;
        }
        self.scratch
            .data_bytes_mut()?
            .copy_from_slice(image.as_bytes());
        Ok(())
    }
}

impl FaceDetector for CascadeDetector {
    fn name(&self) -> &'static str {
        "cascade"
    }

    fn detect(&mut self, image: &GrayImage, params: &DetectionParams) -> Result<Vec<Region>> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(Vec::new());
        }
        self.upload(image)?;

        let mut faces = Vector::<Rect>::new();
        self.classifier.detect_multi_scale(
            &self.scratch,
            &mut faces,
            params.scale_factor,
            params.min_neighbors,
            0,
            Size::new(params.min_size, params.min_size),
            Size::default(),
        )?;

        Ok(faces
            .iter()
            .map(|r| Region::new(r.x, r.y, r.width, r.height))
            .collect())
    }
}
