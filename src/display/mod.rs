//! Display sinks and keyboard polling.
//!
//! - `window`: OpenCV highgui window (feature: backend-opencv)
//! - `headless`: no window; keys come from a script (testing, synthetic runs)

pub mod headless;
#[cfg(feature = "backend-opencv")]
pub mod window;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::frame::Frame;
use crate::overlay::OverlayItem;

pub use headless::HeadlessDisplay;
#[cfg(feature = "backend-opencv")]
pub use window::WindowDisplay;

pub const DEFAULT_WINDOW_TITLE: &str = "Face Size and Distance Detection";
pub const DEFAULT_KEY_WAIT: Duration = Duration::from_millis(1);

/// Where annotated frames go, and where keys come from.
pub trait DisplaySink {
    /// Draw `overlay` onto `frame` and present it.
    fn show(&mut self, frame: &mut Frame, overlay: &[OverlayItem]) -> Result<()>;

    /// Wait up to `wait` for a key press.
    fn poll_key(&mut self, wait: Duration) -> Result<Option<char>>;
}

impl<D: DisplaySink + ?Sized> DisplaySink for Box<D> {
    fn show(&mut self, frame: &mut Frame, overlay: &[OverlayItem]) -> Result<()> {
        (**self).show(frame, overlay)
    }

    fn poll_key(&mut self, wait: Duration) -> Result<Option<char>> {
        (**self).poll_key(wait)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayMode {
    Window,
    Headless,
}

impl FromStr for DisplayMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "window" => Ok(Self::Window),
            "headless" | "none" => Ok(Self::Headless),
            other => Err(anyhow!("unknown display mode '{}'", other)),
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Window => f.write_str("window"),
            Self::Headless => f.write_str("headless"),
        }
    }
}

/// Key wait in whole milliseconds for `waitKey`: at least 1, saturating at
/// `i32::MAX`.
pub fn wait_key_millis(wait: Duration) -> i32 {
    i32::try_from(wait.as_millis()).unwrap_or(i32::MAX).max(1)
}

/// Open the configured sink. `keys` only applies to headless mode.
pub fn open_display(
    mode: DisplayMode,
    window_title: &str,
    keys: Option<&str>,
) -> Result<Box<dyn DisplaySink>> {
    match mode {
        DisplayMode::Headless => Ok(Box::new(match keys {
            Some(script) => HeadlessDisplay::from_script(script),
            None => HeadlessDisplay::new(),
        })),
        DisplayMode::Window => {
            #[cfg(feature = "backend-opencv")]
            {
                if keys.is_some() {
                    log::warn!("key script ignored in window mode");
                }
                Ok(Box::new(WindowDisplay::open(window_title)?))
            }
            #[cfg(not(feature = "backend-opencv"))]
            {
                let _ = keys;
                Err(anyhow!(
                    "window display '{}' requires the backend-opencv feature",
                    window_title
                ))
            }
        }
    }
}
