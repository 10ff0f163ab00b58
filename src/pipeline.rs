//! Measurement loop.
//!
//! One iteration is: acquire → preprocess → detect → render → display →
//! poll key → (calibrate | quit). The loop owns its source, detector, display
//! and calibration state; the source and display are dropped, and therefore
//! released, on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::calibration::{Calibration, Reference};
use crate::detect::{DetectionParams, FaceDetector, Region};
use crate::display::{DisplaySink, DEFAULT_KEY_WAIT};
use crate::frame::Frame;
use crate::ingest::{CaptureError, FrameSource, SourceStats};
use crate::overlay::render_overlay;
use crate::preprocess::preprocess;

/// Keyboard commands. Every other key is ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Quit,
    Calibrate,
}

impl Command {
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            'q' => Some(Self::Quit),
            'c' => Some(Self::Calibrate),
            _ => None,
        }
    }
}

/// Fixed parameters of a session.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasurementSettings {
    pub params: DetectionParams,
    pub reference: Reference,
    pub key_wait: Duration,
}

impl Default for MeasurementSettings {
    fn default() -> Self {
        Self {
            params: DetectionParams::default(),
            reference: Reference::default(),
            key_wait: DEFAULT_KEY_WAIT,
        }
    }
}

#[derive(Debug)]
pub enum StepOutcome {
    Continue,
    Quit,
    /// The source failed or ran dry; the session is over.
    SourceEnded(CaptureError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    Quit,
    SourceEnded,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub faces: u64,
    pub calibrations: u64,
    pub ignored_calibrations: u64,
}

/// Summary returned when a session ends.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionReport {
    pub end: EndReason,
    pub stats: SessionStats,
    pub focal_length: Option<f64>,
    pub source: SourceStats,
}

pub struct MeasurementLoop<S, D, V> {
    source: S,
    detector: D,
    display: V,
    settings: MeasurementSettings,
    calibration: Calibration,
    stats: SessionStats,
    shutdown: Option<Arc<AtomicBool>>,
}

impl<S, D, V> MeasurementLoop<S, D, V>
where
    S: FrameSource,
    D: FaceDetector,
    V: DisplaySink,
{
    pub fn new(source: S, detector: D, display: V, settings: MeasurementSettings) -> Self {
        Self {
            source,
            detector,
            display,
            settings,
            calibration: Calibration::new(),
            stats: SessionStats::default(),
            shutdown: None,
        }
    }

    /// Treat `flag` becoming true as a quit command (e.g. set from Ctrl-C).
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn display(&self) -> &V {
        &self.display
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Preprocess a frame and run the detector on it.
    pub fn analyze(&mut self, frame: &Frame) -> Result<Vec<Region>> {
        let gray = preprocess(frame)
            .with_context(|| format!("preprocessing failed on frame {}", frame.sequence))?;
        let regions = self.detector.detect(&gray, &self.settings.params);
        regions.with_context(|| {
            format!(
                "{} detector failed on frame {}",
                self.detector.name(),
                frame.sequence
            )
        })
    }

    /// Recalibrate from `regions`. A skipped request leaves the state as is.
    pub fn calibrate(&mut self, regions: &[Region]) -> Option<f64> {
        match self.calibration.calibrate(regions, &self.settings.reference) {
            Ok(focal) => {
                self.stats.calibrations += 1;
                println!("Calibration complete! Focal Length: {:.2}", focal);
                log::info!(
                    "calibrated from {}px wide face (known width {} {}, distance {} {})",
                    regions[0].width,
                    self.settings.reference.known_width,
                    self.settings.reference.unit,
                    self.settings.reference.known_distance,
                    self.settings.reference.unit
                );
                Some(focal)
            }
            Err(reason) => {
                self.stats.ignored_calibrations += 1;
                log::warn!("calibration ignored: {}", reason);
                None
            }
        }
    }

    /// Run one iteration of the loop.
    pub fn step(&mut self) -> Result<StepOutcome> {
        if self
            .shutdown
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
        {
            return Ok(StepOutcome::Quit);
        }

        let mut frame = match self.source.next_frame() {
            Ok(frame) => frame,
            Err(e) => return Ok(StepOutcome::SourceEnded(e)),
        };

        let regions = self.analyze(&frame)?;
        self.stats.frames += 1;
        self.stats.faces += regions.len() as u64;

        let overlay = render_overlay(&regions, &self.calibration, &self.settings.reference);
        self.display.show(&mut frame, &overlay)?;

        let key = self.display.poll_key(self.settings.key_wait)?;
        match key.and_then(Command::from_key) {
            Some(Command::Quit) => return Ok(StepOutcome::Quit),
            Some(Command::Calibrate) => {
                self.calibrate(&regions);
            }
            None => {}
        }
        Ok(StepOutcome::Continue)
    }

    /// Run until quit or until the source ends.
    pub fn run(mut self) -> Result<SessionReport> {
        let end = loop {
            match self.step()? {
                StepOutcome::Continue => {}
                StepOutcome::Quit => {
                    log::info!("quit requested");
                    break EndReason::Quit;
                }
                StepOutcome::SourceEnded(e) => {
                    println!("Failed to capture frame");
                    log::warn!("capture stopped: {}", e);
                    break EndReason::SourceEnded;
                }
            }
        };

        let report = SessionReport {
            end,
            stats: self.stats.clone(),
            focal_length: self.calibration.focal_length(),
            source: self.source.stats(),
        };
        log::info!(
            "session ended ({:?}): frames={} faces={} calibrations={} focal_length={}",
            report.end,
            report.stats.frames,
            report.stats.faces,
            report.stats.calibrations,
            report
                .focal_length
                .map(|f| format!("{:.2}", f))
                .unwrap_or_else(|| "unset".to_string())
        );
        Ok(report)
    }
}
