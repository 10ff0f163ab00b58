//! Pinhole calibration and size/distance estimation.
//!
//! A single focal-length estimate is derived from a face of known width held
//! at a known distance. Afterwards every detected face width maps back to an
//! estimated distance through `pixel = real * focal / distance`.

use crate::detect::Region;

/// Reference face width, in `unit`.
pub const KNOWN_WIDTH: f64 = 14.0;
/// Distance the reference face is held at during calibration, in `unit`.
pub const KNOWN_DISTANCE: f64 = 50.0;
pub const DEFAULT_UNIT: &str = "cm";

/// Focal length (in pixels) from a reference object of `known_width` seen
/// `width_in_pixels` wide at `known_distance`.
pub fn calculate_focal_length(known_distance: f64, known_width: f64, width_in_pixels: f64) -> f64 {
    (width_in_pixels * known_distance) / known_width
}

/// Physical reference used for calibration and estimation.
#[derive(Clone, Debug, PartialEq)]
pub struct Reference {
    pub known_width: f64,
    pub known_distance: f64,
    /// Display label for lengths (e.g. "cm").
    pub unit: String,
}

impl Default for Reference {
    fn default() -> Self {
        Self {
            known_width: KNOWN_WIDTH,
            known_distance: KNOWN_DISTANCE,
            unit: DEFAULT_UNIT.to_string(),
        }
    }
}

/// Per-region result once a focal length is known.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Estimate {
    pub real_width: f64,
    pub distance: f64,
}

/// Why a calibration request left the state untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CalibrationSkipped {
    #[error("no face detected")]
    NoFace,
    #[error("first face has zero width")]
    ZeroWidth,
}

/// Calibration state owned by the measurement loop.
///
/// Unset at start. Only [`Calibration::calibrate`] writes it, and only when it
/// is given at least one region.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Calibration {
    focal_length: Option<f64>,
}

impl Calibration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focal_length(&self) -> Option<f64> {
        self.focal_length
    }

    pub fn is_calibrated(&self) -> bool {
        self.focal_length.is_some()
    }

    /// Recompute the focal length from the first region in detector order.
    ///
    /// Returns the new focal length. On error the state is untouched.
    pub fn calibrate(
        &mut self,
        regions: &[Region],
        reference: &Reference,
    ) -> Result<f64, CalibrationSkipped> {
        let first = regions.first().ok_or(CalibrationSkipped::NoFace)?;
        if first.width <= 0 {
            return Err(CalibrationSkipped::ZeroWidth);
        }
        let focal = calculate_focal_length(
            reference.known_distance,
            reference.known_width,
            first.width as f64,
        );
        self.focal_length = Some(focal);
        Ok(focal)
    }

    /// Size and distance for a region, if calibrated.
    ///
    /// Both quantities use `known_width * focal / pixel_width`: the estimated
    /// width is the reference width scaled the same way as the distance.
    pub fn estimate(&self, region: &Region, reference: &Reference) -> Option<Estimate> {
        let focal = self.focal_length?;
        if region.width <= 0 {
            return None;
        }
        let value = (reference.known_width * focal) / region.width as f64;
        Some(Estimate {
            real_width: value,
            distance: value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn focal_length_matches_reference_value() {
        assert!((calculate_focal_length(50.0, 14.0, 100.0) - 357.142_857).abs() < 1e-6);
    }

    #[test]
    fn focal_length_scales_linearly_and_inversely() {
        let base = calculate_focal_length(50.0, 14.0, 100.0);
        assert!(approx(calculate_focal_length(50.0, 14.0, 200.0), base * 2.0));
        assert!(approx(calculate_focal_length(100.0, 14.0, 100.0), base * 2.0));
        assert!(approx(calculate_focal_length(50.0, 28.0, 100.0), base / 2.0));
    }

    #[test]
    fn starts_uncalibrated() {
        let calibration = Calibration::new();
        assert!(!calibration.is_calibrated());
        assert!(calibration
            .estimate(&Region::new(0, 0, 100, 100), &Reference::default())
            .is_none());
    }

    #[test]
    fn calibrate_without_regions_is_a_noop() {
        let reference = Reference::default();
        let mut calibration = Calibration::new();
        assert_eq!(
            calibration.calibrate(&[], &reference),
            Err(CalibrationSkipped::NoFace)
        );
        assert!(!calibration.is_calibrated());

        calibration
            .calibrate(&[Region::new(0, 0, 140, 140)], &reference)
            .unwrap();
        let before = calibration.clone();
        assert_eq!(
            calibration.calibrate(&[], &reference),
            Err(CalibrationSkipped::NoFace)
        );
        assert_eq!(calibration, before);
    }

    #[test]
    fn calibrate_rejects_zero_width_face() {
        let reference = Reference::default();
        let mut calibration = Calibration::new();
        assert_eq!(
            calibration.calibrate(
                &[Region::new(5, 5, 0, 40), Region::new(0, 0, 140, 140)],
                &reference
            ),
            Err(CalibrationSkipped::ZeroWidth)
        );
        assert!(!calibration.is_calibrated());
    }

    #[test]
    fn calibrate_uses_first_region_and_overwrites() {
        let reference = Reference::default();
        let mut calibration = Calibration::new();
        let focal = calibration.calibrate(
            &[Region::new(0, 0, 140, 150), Region::new(0, 0, 280, 280)],
            &reference,
        );
        assert_eq!(focal, Ok(500.0));

        calibration
            .calibrate(&[Region::new(0, 0, 70, 70)], &reference)
            .unwrap();
        assert_eq!(calibration.focal_length(), Some(250.0));
    }

    #[test]
    fn round_trip_reproduces_known_distance() {
        let reference = Reference::default();
        for w0 in [37, 90, 140, 333] {
            let mut calibration = Calibration::new();
            calibration
                .calibrate(&[Region::new(0, 0, w0, w0)], &reference)
                .unwrap();
            let est = calibration
                .estimate(&Region::new(10, 10, w0, w0), &reference)
                .unwrap();
            assert!(approx(est.distance, KNOWN_DISTANCE));
        }
    }

    #[test]
    fn estimate_decreases_with_pixel_width() {
        let reference = Reference::default();
        let mut calibration = Calibration::new();
        calibration
            .calibrate(&[Region::new(0, 0, 120, 120)], &reference)
            .unwrap();
        let mut last = f64::INFINITY;
        for w in (50..400).step_by(25) {
            let est = calibration
                .estimate(&Region::new(0, 0, w, w), &reference)
                .unwrap();
            assert!(est.distance < last);
            assert_eq!(est.real_width, est.distance);
            last = est.distance;
        }
    }

    #[test]
    fn end_to_end_scenario() {
        let reference = Reference::default();
        let mut calibration = Calibration::new();
        assert_eq!(
            calibration.calibrate(&[Region::new(0, 0, 140, 140)], &reference),
            Ok(500.0)
        );
        let est = calibration
            .estimate(&Region::new(0, 0, 70, 70), &reference)
            .unwrap();
        assert!(approx(est.distance, 100.0));
    }
}
