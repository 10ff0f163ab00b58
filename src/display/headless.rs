use std::collections::VecDeque;
use std::time::Duration;

use anyhow::Result;

use super::DisplaySink;
use crate::frame::Frame;
use crate::overlay::OverlayItem;

/// Marks an iteration without a key press in a key script.
pub const NO_KEY: char = '.';

/// Display sink without a window.
///
/// Each `poll_key` consumes one entry of the key script; once the script is
/// exhausted no keys are reported. The last overlay is kept for inspection.
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    keys: VecDeque<Option<char>>,
    frames_shown: u64,
    last_overlay: Vec<OverlayItem>,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script where every character is one poll and `.` means no key,
    /// e.g. `"..c..q"`.
    pub fn from_script(script: &str) -> Self {
        Self::with_keys(
            script
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(|c| (c != NO_KEY).then_some(c)),
        )
    }

    pub fn with_keys(keys: impl IntoIterator<Item = Option<char>>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }

    pub fn last_overlay(&self) -> &[OverlayItem] {
        &self.last_overlay
    }
}

impl DisplaySink for HeadlessDisplay {
    fn show(&mut self, frame: &mut Frame, overlay: &[OverlayItem]) -> Result<()> {
        self.frames_shown += 1;
        self.last_overlay = overlay.to_vec();
        log::trace!(
            "headless: frame {} with {} overlay item(s)",
            frame.sequence,
            overlay.len()
        );
        Ok(())
    }

    fn poll_key(&mut self, _wait: Duration) -> Result<Option<char>> {
        Ok(self.keys.pop_front().flatten())
    }
}
