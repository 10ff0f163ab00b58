//! Annotation layout.
//!
//! `render_overlay` decides what to draw for a frame's regions; display sinks
//! rasterize the returned items. Layout never touches calibration state
//! beyond reading it.

use crate::calibration::{Calibration, Reference};
use crate::detect::Region;

/// BGR color, the channel order frames use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub b: u8,
    pub g: u8,
    pub r: u8,
}

impl Color {
    pub const BLUE: Color = Color::bgr(255, 0, 0);
    pub const GREEN: Color = Color::bgr(0, 255, 0);
    pub const RED: Color = Color::bgr(0, 0, 255);
    pub const YELLOW: Color = Color::bgr(0, 255, 255);

    pub const fn bgr(b: u8, g: u8, r: u8) -> Self {
        Self { b, g, r }
    }
}

/// Prompt shown on faces while no focal length is known.
pub const CALIBRATE_PROMPT: &str = "Calibrate using 'c'";

#[derive(Clone, Debug, PartialEq)]
pub enum OverlayItem {
    Rect {
        region: Region,
        color: Color,
        thickness: i32,
    },
    Text {
        text: String,
        /// Bottom-left corner of the text baseline.
        x: i32,
        y: i32,
        scale: f64,
        color: Color,
        thickness: i32,
    },
}

impl OverlayItem {
    pub fn text(&self) -> Option<&str> {
        match self {
            OverlayItem::Text { text, .. } => Some(text),
            OverlayItem::Rect { .. } => None,
        }
    }
}

/// Lay out the annotations for one frame.
pub fn render_overlay(
    regions: &[Region],
    calibration: &Calibration,
    reference: &Reference,
) -> Vec<OverlayItem> {
    let mut items = Vec::with_capacity(regions.len() * 4);
    for region in regions {
        items.push(OverlayItem::Rect {
            region: *region,
            color: Color::BLUE,
            thickness: 2,
        });
        items.push(OverlayItem::Text {
            text: format!("Width: {}px, Height: {}px", region.width, region.height),
            x: region.x,
            y: region.bottom() + 20,
            scale: 0.5,
            color: Color::YELLOW,
            thickness: 1,
        });

        match calibration.estimate(region, reference) {
            Some(estimate) => {
                items.push(OverlayItem::Text {
                    text: format!("Size: {:.2} {}", estimate.real_width, reference.unit),
                    x: region.x,
                    y: region.y - 10,
                    scale: 0.6,
                    color: Color::GREEN,
                    thickness: 2,
                });
                items.push(OverlayItem::Text {
                    text: format!("Distance: {:.2} {}", estimate.distance, reference.unit),
                    x: region.x,
                    y: region.y - 30,
                    scale: 0.6,
                    color: Color::YELLOW,
                    thickness: 2,
                });
            }
            None => items.push(OverlayItem::Text {
                text: CALIBRATE_PROMPT.to_string(),
                x: region.x,
                y: region.y - 10,
                scale: 0.6,
                color: Color::RED,
                thickness: 2,
            }),
        }
    }
    items
}
