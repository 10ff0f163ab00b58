use std::collections::VecDeque;

use super::{CaptureError, FrameSource, SourceStats};
use crate::frame::Frame;

/// In-memory source that yields queued frames, then reports end of stream.
pub struct ScriptedSource {
    frames: VecDeque<Frame>,
    frame_count: u64,
}

impl ScriptedSource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            frame_count: 0,
        }
    }

    /// `count` blank frames of the given size.
    pub fn blank(count: usize, width: u32, height: u32) -> Self {
        Self::new((1..=count as u64).map(|seq| Frame::filled(width, height, [0, 0, 0], seq)))
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        let frame = self.frames.pop_front().ok_or(CaptureError::EndOfStream {
            frames: self.frame_count,
        })?;
        self.frame_count += 1;
        Ok(frame)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            uri: "scripted://".to_string(),
        }
    }
}
