//! Still image source.
//!
//! Plays a single image file, or every supported image in a directory sorted
//! by file name, once each. Decoding uses the `image` crate; pixels are
//! reordered to BGR so stills look like camera frames downstream.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

use super::{CaptureError, FrameSource, SourceStats};
use crate::frame::{Frame, BGR_CHANNELS};

const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub struct StillSource {
    uri: String,
    paths: Vec<PathBuf>,
    next: usize,
}

impl StillSource {
    pub fn open(uri: &str) -> Result<Self, CaptureError> {
        let path = Path::new(uri);
        let paths = if path.is_dir() {
            let mut paths = Vec::new();
            let entries = std::fs::read_dir(path)
                .with_context(|| format!("failed to read directory {}", path.display()))?;
            for entry in entries {
                let entry = entry.context("failed to read directory entry")?;
                let candidate = entry.path();
                if is_supported(&candidate) {
                    paths.push(candidate);
                }
            }
            paths.sort();
            paths
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            return Err(CaptureError::Open {
                uri: uri.to_string(),
            });
        };

        if paths.is_empty() {
            return Err(CaptureError::Other(anyhow!(
                "no images ({}) found in {}",
                SUPPORTED_EXTENSIONS.join(", "),
                path.display()
            )));
        }
        log::info!("StillSource: {} image(s) from {}", paths.len(), uri);
        Ok(Self {
            uri: uri.to_string(),
            paths,
            next: 0,
        })
    }

    pub fn image_count(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for StillSource {
    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        let Some(path) = self.paths.get(self.next) else {
            return Err(CaptureError::EndOfStream {
                frames: self.next as u64,
            });
        };
        let image = image::open(path)
            .map_err(|e| CaptureError::Read(format!("{}: {}", path.display(), e)))?
            .to_rgb8();
        let (width, height) = image.dimensions();

        let mut bgr = image.into_raw();
        for px in bgr.chunks_exact_mut(BGR_CHANNELS) {
            px.swap(0, 2);
        }

        self.next += 1;
        log::debug!("StillSource: frame {} from {}", self.next, path.display());
        Ok(Frame::from_bgr(bgr, width, height, self.next as u64)?)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.next as u64,
            uri: self.uri.clone(),
        }
    }
}

fn is_supported(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}
