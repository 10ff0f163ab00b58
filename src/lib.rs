//! Face size and camera distance estimation.
//!
//! A single measurement loop reads frames, finds faces with an opaque
//! detector, and annotates each face with its pixel size and, once a focal
//! length has been calibrated from a reference face, its estimated size and
//! distance.
//!
//! # Module Structure
//!
//! - `frame`: BGR frames and gray images
//! - `ingest`: Frame sources (camera, still images, synthetic, scripted)
//! - `preprocess`: Gray conversion, blur, histogram equalization
//! - `detect`: Face detector capability and backends
//! - `calibration`: Pinhole focal length and estimates
//! - `overlay`: Annotation layout
//! - `display`: Display sinks and key polling
//! - `pipeline`: The measurement loop
//! - `config`: Layered configuration

pub mod calibration;
pub mod config;
pub mod detect;
pub mod display;
pub mod frame;
pub mod ingest;
pub mod overlay;
pub mod pipeline;
pub mod preprocess;

pub use calibration::{
    calculate_focal_length, Calibration, CalibrationSkipped, Estimate, Reference, KNOWN_DISTANCE,
    KNOWN_WIDTH,
};
pub use config::FacegaugeConfig;
pub use detect::{build_detector, DetectionParams, DetectorKind, FaceDetector, Region, StubDetector};
pub use display::{open_display, DisplayMode, DisplaySink, HeadlessDisplay};
pub use frame::{Frame, GrayImage};
pub use ingest::{open_source, CaptureError, FrameSource, ScriptedSource, SourceConfig, SyntheticSource};
pub use overlay::{render_overlay, Color, OverlayItem, CALIBRATE_PROMPT};
pub use pipeline::{
    Command, EndReason, MeasurementLoop, MeasurementSettings, SessionReport, SessionStats,
    StepOutcome,
};
pub use preprocess::preprocess;
