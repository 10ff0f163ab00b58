//! OpenCV-backed camera capture.
//!
//! The capture device is opened once and released when the source is dropped,
//! whichever way the session ends.

use anyhow::anyhow;
use opencv::{
    core::{self, Mat},
    prelude::*,
    videoio::{self, VideoCapture},
};

use super::{CaptureError, FrameSource, SourceConfig, SourceStats};
use crate::frame::Frame;

pub struct CameraSource {
    capture: VideoCapture,
    scratch: Mat,
    uri: String,
    frame_count: u64,
}

impl CameraSource {
    pub fn open(index: i32, config: &SourceConfig) -> Result<Self, CaptureError> {
        let mut capture = open_device(index)?;
        configure_camera(&mut capture, config.width, config.height);
        log::info!("CameraSource: opened device #{}", index);
        Ok(Self {
            capture,
            scratch: Mat::default(),
            uri: config.uri.clone(),
            frame_count: 0,
        })
    }

    fn to_frame(&self) -> Result<Frame, CaptureError> {
        if self.scratch.typ() != core::CV_8UC3 {
            return Err(CaptureError::Read(format!(
                "unexpected frame type {} (want 8-bit BGR)",
                self.scratch.typ()
            )));
        }
        let size = self.scratch.size().map_err(opencv_err)?;
        let data = if self.scratch.is_continuous() {
            self.scratch.data_bytes().map_err(opencv_err)?.to_vec()
        } else {
            self.scratch
                .try_clone()
                .map_err(opencv_err)?
                .data_bytes()
                .map_err(opencv_err)?
                .to_vec()
        };
        Ok(Frame::from_bgr(
            data,
            size.width as u32,
            size.height as u32,
            self.frame_count,
        )?)
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        let ok = self.capture.read(&mut self.scratch).map_err(opencv_err)?;
        if !ok || self.scratch.empty() {
            return Err(CaptureError::EndOfStream {
                frames: self.frame_count,
            });
        }
        self.frame_count += 1;
        self.to_frame()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            uri: self.uri.clone(),
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            log::warn!("CameraSource: release failed: {}", e);
        } else {
            log::debug!("CameraSource: released {}", self.uri);
        }
    }
}

fn open_device(index: i32) -> Result<VideoCapture, CaptureError> {
    for backend in [videoio::CAP_V4L, videoio::CAP_ANY] {
        match VideoCapture::new(index, backend) {
            Ok(cap) => {
                if cap.is_opened().map_err(opencv_err)? {
                    return Ok(cap);
                }
            }
            Err(err) => {
                log::warn!(
                    "CameraSource: failed to open device #{} with backend {}: {}",
                    index,
                    backend,
                    err
                );
            }
        }
    }
    Err(CaptureError::Open {
        uri: index.to_string(),
    })
}

/// Resolution hints; cameras are free to ignore them.
fn configure_camera(cap: &mut VideoCapture, width: u32, height: u32) {
    let _ = cap.set(videoio::CAP_PROP_FRAME_WIDTH, width as f64);
    let _ = cap.set(videoio::CAP_PROP_FRAME_HEIGHT, height as f64);
}

fn opencv_err(err: opencv::Error) -> CaptureError {
    CaptureError::Other(anyhow!(err))
}
