//! Frame and image containers.
//!
//! - `Frame`: BGR8 raster handed out by a frame source, one per loop iteration.
//! - `GrayImage`: single-channel 8-bit raster produced by preprocessing and
//!   consumed by detector backends.

use anyhow::{anyhow, Result};

/// Bytes per pixel of a BGR8 frame.
pub const BGR_CHANNELS: usize = 3;

/// BGR8 frame captured from a video source.
///
/// Frames are not `Clone`: each iteration owns exactly one and drops it before
/// the next acquisition.
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Monotonic index assigned by the source (1-based).
    pub sequence: u64,
}

impl Frame {
    /// Wrap a packed BGR8 buffer. The buffer length must be `width * height * 3`.
    pub fn from_bgr(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let expected = width as usize * height as usize * BGR_CHANNELS;
        if data.len() != expected {
            return Err(anyhow!(
                "frame buffer has {} bytes, expected {} for {}x{} BGR",
                data.len(),
                expected,
                width,
                height
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            sequence,
        })
    }

    /// Frame filled with a single BGR color.
    pub fn filled(width: u32, height: u32, bgr: [u8; 3], sequence: u64) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * BGR_CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&bgr);
        }
        Self {
            data,
            width,
            height,
            sequence,
        }
    }

    pub fn bgr_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn bgr_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// BGR triple at `(x, y)`. Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * BGR_CHANNELS;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Single-channel 8-bit image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl GrayImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0; width as usize * height as usize],
            width,
            height,
        }
    }

    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if data.len() != width as usize * height as usize {
            return Err(anyhow!(
                "gray buffer has {} bytes, expected {}x{}",
                data.len(),
                width,
                height
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            data,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bgr_rejects_wrong_length() {
        assert!(Frame::from_bgr(vec![0; 10], 2, 2, 1).is_err());
        assert!(Frame::from_bgr(vec![0; 12], 2, 2, 1).is_ok());
    }

    #[test]
    fn filled_frame_repeats_color() {
        let frame = Frame::filled(3, 2, [1, 2, 3], 7);
        assert_eq!(frame.bgr_bytes().len(), 18);
        assert_eq!(frame.pixel(2, 1), [1, 2, 3]);
        assert_eq!(frame.sequence, 7);
    }

    #[test]
    fn gray_from_fn_is_row_major() {
        let img = GrayImage::from_fn(4, 2, |x, y| (x + 10 * y) as u8);
        assert_eq!(img.get(3, 0), 3);
        assert_eq!(img.get(1, 1), 11);
        assert_eq!(img.as_bytes()[5], 11);
    }
}
