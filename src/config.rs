use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::calibration::{Reference, DEFAULT_UNIT, KNOWN_DISTANCE, KNOWN_WIDTH};
use crate::detect::{DetectionParams, DetectorKind};
use crate::display::{DisplayMode, DEFAULT_WINDOW_TITLE};
use crate::ingest::{SourceConfig, DEFAULT_HEIGHT, DEFAULT_SYNTHETIC_FRAMES, DEFAULT_WIDTH};
use crate::pipeline::MeasurementSettings;

#[cfg(feature = "backend-opencv")]
const DEFAULT_SOURCE: &str = "0";
#[cfg(not(feature = "backend-opencv"))]
const DEFAULT_SOURCE: &str = "stub://camera";
#[cfg(feature = "backend-opencv")]
const DEFAULT_BACKEND: DetectorKind = DetectorKind::Cascade;
#[cfg(not(feature = "backend-opencv"))]
const DEFAULT_BACKEND: DetectorKind = DetectorKind::Stub;
#[cfg(feature = "backend-opencv")]
const DEFAULT_DISPLAY: DisplayMode = DisplayMode::Window;
#[cfg(not(feature = "backend-opencv"))]
const DEFAULT_DISPLAY: DisplayMode = DisplayMode::Headless;

pub const DEFAULT_CASCADE_PATH: &str =
    "/usr/share/opencv4/haarcascades/haarcascade_frontalface_default.xml";
const DEFAULT_KEY_WAIT_MS: u64 = 1;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FacegaugeConfigFile {
    source: Option<SourceConfigFile>,
    detector: Option<DetectorConfigFile>,
    reference: Option<ReferenceConfigFile>,
    display: Option<DisplayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SourceConfigFile {
    uri: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    frames: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectorConfigFile {
    backend: Option<String>,
    cascade_path: Option<PathBuf>,
    scale_factor: Option<f64>,
    min_neighbors: Option<i32>,
    min_size: Option<i32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ReferenceConfigFile {
    known_width: Option<f64>,
    known_distance: Option<f64>,
    unit: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DisplayConfigFile {
    mode: Option<String>,
    window_title: Option<String>,
    key_wait_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FacegaugeConfig {
    pub source: SourceConfig,
    pub detector: DetectorSettings,
    pub reference: Reference,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSettings {
    pub backend: DetectorKind,
    pub cascade_path: PathBuf,
    pub params: DetectionParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySettings {
    pub mode: DisplayMode,
    pub window_title: String,
    pub key_wait: Duration,
}

/// Command-line overrides, applied after the file and env layers.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source: Option<String>,
    pub backend: Option<String>,
    pub cascade_path: Option<PathBuf>,
    pub display: Option<String>,
}

impl Default for FacegaugeConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                uri: DEFAULT_SOURCE.to_string(),
                ..SourceConfig::default()
            },
            detector: DetectorSettings {
                backend: DEFAULT_BACKEND,
                cascade_path: PathBuf::from(DEFAULT_CASCADE_PATH),
                params: DetectionParams::default(),
            },
            reference: Reference::default(),
            display: DisplaySettings {
                mode: DEFAULT_DISPLAY,
                window_title: DEFAULT_WINDOW_TITLE.to_string(),
                key_wait: Duration::from_millis(DEFAULT_KEY_WAIT_MS),
            },
        }
    }
}

impl FacegaugeConfig {
    /// Defaults, then the file named by `FACEGAUGE_CONFIG`, then env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("FACEGAUGE_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Like [`FacegaugeConfig::load`] with an explicit config file.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: FacegaugeConfigFile) -> Result<Self> {
        let source = file.source.unwrap_or_default();
        let source = SourceConfig {
            uri: source.uri.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            width: source.width.unwrap_or(DEFAULT_WIDTH),
            height: source.height.unwrap_or(DEFAULT_HEIGHT),
            frames: source.frames.unwrap_or(DEFAULT_SYNTHETIC_FRAMES),
        };

        let detector = file.detector.unwrap_or_default();
        let defaults = DetectionParams::default();
        let detector = DetectorSettings {
            backend: match detector.backend {
                Some(name) => name.parse()?,
                None => DEFAULT_BACKEND,
            },
            cascade_path: detector
                .cascade_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CASCADE_PATH)),
            params: DetectionParams {
                scale_factor: detector.scale_factor.unwrap_or(defaults.scale_factor),
                min_neighbors: detector.min_neighbors.unwrap_or(defaults.min_neighbors),
                min_size: detector.min_size.unwrap_or(defaults.min_size),
            },
        };

        let reference = file.reference.unwrap_or_default();
        let reference = Reference {
            known_width: reference.known_width.unwrap_or(KNOWN_WIDTH),
            known_distance: reference.known_distance.unwrap_or(KNOWN_DISTANCE),
            unit: reference.unit.unwrap_or_else(|| DEFAULT_UNIT.to_string()),
        };

        let display = file.display.unwrap_or_default();
        let display = DisplaySettings {
            mode: match display.mode {
                Some(mode) => mode.parse()?,
                None => DEFAULT_DISPLAY,
            },
            window_title: display
                .window_title
                .unwrap_or_else(|| DEFAULT_WINDOW_TITLE.to_string()),
            key_wait: Duration::from_millis(display.key_wait_ms.unwrap_or(DEFAULT_KEY_WAIT_MS)),
        };

        Ok(Self {
            source,
            detector,
            reference,
            display,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(uri) = std::env::var("FACEGAUGE_SOURCE") {
            if !uri.trim().is_empty() {
                self.source.uri = uri;
            }
        }
        if let Ok(path) = std::env::var("FACEGAUGE_CASCADE_PATH") {
            if !path.trim().is_empty() {
                self.detector.cascade_path = PathBuf::from(path);
            }
        }
        if let Ok(backend) = std::env::var("FACEGAUGE_BACKEND") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend.parse()?;
            }
        }
        if let Ok(mode) = std::env::var("FACEGAUGE_DISPLAY") {
            if !mode.trim().is_empty() {
                self.display.mode = mode.parse()?;
            }
        }
        if let Ok(width) = std::env::var("FACEGAUGE_KNOWN_WIDTH") {
            self.reference.known_width = width
                .trim()
                .parse()
                .map_err(|_| anyhow!("FACEGAUGE_KNOWN_WIDTH must be a number"))?;
        }
        if let Ok(distance) = std::env::var("FACEGAUGE_KNOWN_DISTANCE") {
            self.reference.known_distance = distance
                .trim()
                .parse()
                .map_err(|_| anyhow!("FACEGAUGE_KNOWN_DISTANCE must be a number"))?;
        }
        Ok(())
    }

    /// Apply command-line overrides. Call [`FacegaugeConfig::validate`] after.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        if let Some(source) = &overrides.source {
            self.source.uri = source.clone();
        }
        if let Some(backend) = &overrides.backend {
            self.detector.backend = backend.parse()?;
        }
        if let Some(cascade) = &overrides.cascade_path {
            self.detector.cascade_path = cascade.clone();
        }
        if let Some(display) = &overrides.display {
            self.display.mode = display.parse()?;
        }
        Ok(())
    }

    /// Reject settings the loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.source.uri.trim().is_empty() {
            return Err(anyhow!("source uri must not be empty"));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source width and height must be greater than zero"));
        }
        let params = &self.detector.params;
        if params.scale_factor.is_nan() || params.scale_factor <= 1.0 {
            return Err(anyhow!(
                "detector scale_factor must be greater than 1 (got {})",
                params.scale_factor
            ));
        }
        if params.min_neighbors < 0 {
            return Err(anyhow!("detector min_neighbors must not be negative"));
        }
        if params.min_size <= 0 {
            return Err(anyhow!("detector min_size must be greater than zero"));
        }
        let width = self.reference.known_width;
        if !(width.is_finite() && width > 0.0) {
            return Err(anyhow!("reference known_width must be a positive number"));
        }
        let distance = self.reference.known_distance;
        if !(distance.is_finite() && distance > 0.0) {
            return Err(anyhow!("reference known_distance must be a positive number"));
        }
        Ok(())
    }

    pub fn measurement_settings(&self) -> MeasurementSettings {
        MeasurementSettings {
            params: self.detector.params,
            reference: self.reference.clone(),
            key_wait: self.display.key_wait,
        }
    }
}

fn read_config_file(path: &Path) -> Result<FacegaugeConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let cfg = if is_json {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_constants() {
        let cfg = FacegaugeConfig::from_file(FacegaugeConfigFile::default()).unwrap();
        assert_eq!(cfg, FacegaugeConfig::default());
        assert_eq!(cfg.reference.known_width, 14.0);
        assert_eq!(cfg.reference.known_distance, 50.0);
        assert_eq!(cfg.detector.params.scale_factor, 1.05);
        assert_eq!(cfg.detector.params.min_neighbors, 8);
        assert_eq!(cfg.detector.params.min_size, 50);
        assert_eq!(cfg.display.key_wait, Duration::from_millis(1));
        assert_eq!(cfg.display.window_title, "Face Size and Distance Detection");
        cfg.validate().unwrap();
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = FacegaugeConfig::default();
        cfg.detector.params.scale_factor = 1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = FacegaugeConfig::default();
        cfg.reference.known_width = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = FacegaugeConfig::default();
        cfg.reference.known_distance = f64::NAN;
        assert!(cfg.validate().is_err());

        let mut cfg = FacegaugeConfig::default();
        cfg.detector.params.min_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let mut cfg = FacegaugeConfig::default();
        cfg.apply_overrides(&ConfigOverrides {
            source: Some("stub://desk".to_string()),
            display: Some("headless".to_string()),
            ..ConfigOverrides::default()
        })
        .unwrap();
        assert_eq!(cfg.source.uri, "stub://desk");
        assert_eq!(cfg.display.mode, DisplayMode::Headless);
        assert_eq!(cfg.detector.backend, DEFAULT_BACKEND);
        assert_eq!(cfg.detector.cascade_path, PathBuf::from(DEFAULT_CASCADE_PATH));

        let err = cfg.apply_overrides(&ConfigOverrides {
            backend: Some("dnn".to_string()),
            ..ConfigOverrides::default()
        });
        assert!(err.is_err());
    }

    #[test]
    fn unknown_backend_is_an_error() {
        let file = FacegaugeConfigFile {
            detector: Some(DetectorConfigFile {
                backend: Some("dnn".to_string()),
                ..DetectorConfigFile::default()
            }),
            ..FacegaugeConfigFile::default()
        };
        assert!(FacegaugeConfig::from_file(file).is_err());
    }
}
