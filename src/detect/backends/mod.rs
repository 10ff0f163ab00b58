#[cfg(feature = "backend-opencv")]
pub mod cascade;
pub mod stub;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Result};

use crate::detect::backend::FaceDetector;

#[cfg(feature = "backend-opencv")]
pub use cascade::CascadeDetector;
pub use stub::StubDetector;

/// Detector backends selectable from configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectorKind {
    /// OpenCV Haar cascade.
    Cascade,
    /// Bright-patch threshold detector for synthetic sources.
    Stub,
}

impl FromStr for DetectorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cascade" | "haar" => Ok(Self::Cascade),
            "stub" => Ok(Self::Stub),
            other => Err(anyhow!("unknown detector backend '{}'", other)),
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cascade => f.write_str("cascade"),
            Self::Stub => f.write_str("stub"),
        }
    }
}

/// Construct the configured backend. The cascade model is loaded here, once.
pub fn build_detector(kind: DetectorKind, cascade_path: &Path) -> Result<Box<dyn FaceDetector>> {
    match kind {
        DetectorKind::Stub => Ok(Box::new(StubDetector::threshold())),
        DetectorKind::Cascade => {
            #[cfg(feature = "backend-opencv")]
            {
                Ok(Box::new(CascadeDetector::load(cascade_path)?))
            }
            #[cfg(not(feature = "backend-opencv"))]
            {
                Err(anyhow!(
                    "cascade backend ({}) requires the backend-opencv feature",
                    cascade_path.display()
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names() {
        assert_eq!("cascade".parse::<DetectorKind>().unwrap(), DetectorKind::Cascade);
        assert_eq!(" Haar ".parse::<DetectorKind>().unwrap(), DetectorKind::Cascade);
        assert_eq!("stub".parse::<DetectorKind>().unwrap(), DetectorKind::Stub);
        assert!("yolo".parse::<DetectorKind>().is_err());
    }

    #[test]
    fn stub_backend_builds_without_model() {
        let detector = build_detector(DetectorKind::Stub, Path::new("/nonexistent.xml")).unwrap();
        assert_eq!(detector.name(), "stub");
    }
}
