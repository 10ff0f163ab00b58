use std::time::Duration;

use anyhow::{Context, Result};
use opencv::{
    core::{self, Mat, Point, Rect, Scalar},
    highgui, imgproc,
    prelude::*,
};

use super::{wait_key_millis, DisplaySink};
use crate::frame::Frame;
use crate::overlay::{Color, OverlayItem};

/// OpenCV highgui window. Destroyed when dropped.
pub struct WindowDisplay {
    title: String,
    canvas: Mat,
}

impl WindowDisplay {
    pub fn open(title: &str) -> Result<Self> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)
            .with_context(|| format!("failed to open window '{}'", title))?;
        Ok(Self {
            title: title.to_string(),
            canvas: Mat::default(),
        })
    }

    fn upload(&mut self, frame: &Frame) -> Result<()> {
        let rows = frame.height as i32;
        let cols = frame.width as i32;
        let size = self.canvas.size()?;
        if size.width != cols || size.height != rows || self.canvas.typ() != core::CV_8UC3 {
            self.canvas =
                Mat::new_rows_cols_with_default(rows, cols, core::CV_8UC3, Scalar::all(0.0))?;
        }
        self.canvas
            .data_bytes_mut()?
            .copy_from_slice(frame.bgr_bytes());
        Ok(())
    }

    fn draw(&mut self, item: &OverlayItem) -> Result<()> {
        match item {
            OverlayItem::Rect {
                region,
                color,
                thickness,
            } => imgproc::rectangle(
                &mut self.canvas,
                Rect::new(region.x, region.y, region.width, region.height),
                scalar(*color),
                *thickness,
                imgproc::LINE_8,
                0,
            )?,
            OverlayItem::Text {
                text,
                x,
                y,
                scale,
                color,
                thickness,
            } => imgproc::put_text(
                &mut self.canvas,
                text,
                Point::new(*x, *y),
                imgproc::FONT_HERSHEY_SIMPLEX,
                *scale,
                scalar(*color),
                *thickness,
                imgproc::LINE_8,
                false,
            )?,
        }
        Ok(())
    }
}

impl DisplaySink for WindowDisplay {
    fn show(&mut self, frame: &mut Frame, overlay: &[OverlayItem]) -> Result<()> {
        self.upload(frame)?;
        for item in overlay {
            self.draw(item)?;
        }
        highgui::imshow(&self.title, &self.canvas)?;
        frame
            .bgr_bytes_mut()
            .copy_from_slice(self.canvas.data_bytes()?);
        Ok(())
    }

    fn poll_key(&mut self, wait: Duration) -> Result<Option<char>> {
        let delay = wait_key_millis(wait);
        let key = highgui::wait_key(delay)?;
        if key < 0 {
            return Ok(None);
        }
        Ok(char::from_u32((key & 0xFF) as u32))
    }
}

impl Drop for WindowDisplay {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_window(&self.title) {
            log::warn!("failed to destroy window '{}': {}", self.title, e);
        }
    }
}

fn scalar(color: Color) -> Scalar {
    Scalar::new(color.b as f64, color.g as f64, color.r as f64, 0.0)
}
