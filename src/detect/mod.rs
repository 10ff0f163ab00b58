mod backend;
mod backends;
mod result;

pub use backend::{DetectionParams, FaceDetector};
#[cfg(feature = "backend-opencv")]
pub use backends::CascadeDetector;
pub use backends::{build_detector, DetectorKind, StubDetector};
pub use result::Region;
