//! Frame ingestion sources.
//!
//! This module provides the sources the measurement loop reads from:
//! - Local cameras by index or `/dev/videoN` (feature: backend-opencv)
//! - Still images, a single file or a directory played once in name order
//! - Synthetic `stub://` scenes (testing, demos)
//! - Scripted in-memory frames (testing)
//!
//! A source hands out one `Frame` per call. Any failure, including the end of
//! a finite stream, is reported as a `CaptureError` and ends the session.

#[cfg(feature = "backend-opencv")]
pub mod camera;
pub mod scripted;
pub mod still;
pub mod synthetic;

use anyhow::anyhow;
use thiserror::Error;

use crate::frame::Frame;

#[cfg(feature = "backend-opencv")]
pub use camera::CameraSource;
pub use scripted::ScriptedSource;
pub use still::StillSource;
pub use synthetic::SyntheticSource;

pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 480;
pub const DEFAULT_SYNTHETIC_FRAMES: u64 = 300;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open video source {uri:?}")]
    Open { uri: String },
    #[error("end of stream after {frames} frames")]
    EndOfStream { frames: u64 },
    #[error("frame read failed: {0}")]
    Read(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration for a frame source.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceConfig {
    /// Camera index, `/dev/videoN`, `stub://name`, or a local image path.
    pub uri: String,
    /// Requested capture width (camera hint, synthetic frame size).
    pub width: u32,
    /// Requested capture height (camera hint, synthetic frame size).
    pub height: u32,
    /// Frames a synthetic source yields before reporting end of stream.
    pub frames: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            uri: "0".to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            frames: DEFAULT_SYNTHETIC_FRAMES,
        }
    }
}

/// Statistics for a frame source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub uri: String,
}

/// Blocking, synchronous frame source.
pub trait FrameSource {
    /// Capture the next frame. Errors are fatal for the session.
    fn next_frame(&mut self) -> Result<Frame, CaptureError>;

    fn stats(&self) -> SourceStats;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        (**self).next_frame()
    }

    fn stats(&self) -> SourceStats {
        (**self).stats()
    }
}

/// Open the source named by `config.uri`.
pub fn open_source(config: &SourceConfig) -> Result<Box<dyn FrameSource>, CaptureError> {
    let uri = config.uri.trim();
    if uri.is_empty() {
        return Err(CaptureError::Other(anyhow!("source uri must not be empty")));
    }
    if uri.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(config.clone())));
    }
    if let Some(index) = parse_device_index(uri) {
        #[cfg(feature = "backend-opencv")]
        {
            return Ok(Box::new(CameraSource::open(index, config)?));
        }
        #[cfg(not(feature = "backend-opencv"))]
        {
            return Err(CaptureError::Other(anyhow!(
                "camera #{} requires the backend-opencv feature",
                index
            )));
        }
    }
    if uri.contains("://") {
        return Err(CaptureError::Open {
            uri: uri.to_string(),
        });
    }
    Ok(Box::new(StillSource::open(uri)?))
}

/// Parse a device index from `N` or `/dev/videoN`.
pub fn parse_device_index(uri: &str) -> Option<i32> {
    if let Ok(index) = uri.parse::<i32>() {
        return (index >= 0).then_some(index);
    }
    let stripped = uri.strip_prefix("/dev/video")?;
    if !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit()) {
        return stripped.parse::<i32>().ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_indices() {
        assert_eq!(parse_device_index("0"), Some(0));
        assert_eq!(parse_device_index("/dev/video2"), Some(2));
        assert_eq!(parse_device_index("/dev/video"), None);
        assert_eq!(parse_device_index("-1"), None);
        assert_eq!(parse_device_index("stub://cam"), None);
        assert_eq!(parse_device_index("faces/"), None);
    }

    #[test]
    fn opens_synthetic_source_for_stub_uri() {
        let config = SourceConfig {
            uri: "stub://bench".to_string(),
            width: 64,
            height: 48,
            frames: 2,
        };
        let mut source = open_source(&config).unwrap();
        let frame = source.next_frame().unwrap();
        assert_eq!((frame.width, frame.height), (64, 48));
        assert_eq!(source.stats().uri, "stub://bench");
    }

    #[test]
    fn rejects_empty_and_remote_uris() {
        let mut config = SourceConfig::default();
        config.uri = "  ".to_string();
        assert!(open_source(&config).is_err());
        config.uri = "rtsp://camera/stream".to_string();
        assert!(matches!(
            open_source(&config),
            Err(CaptureError::Open { .. })
        ));
    }

    #[test]
    fn missing_still_path_fails_to_open() {
        let mut config = SourceConfig::default();
        config.uri = "/nonexistent/facegauge/stills".to_string();
        assert!(open_source(&config).is_err());
    }
}
