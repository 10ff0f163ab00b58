//! Detector input preparation.
//!
//! `preprocess` turns a BGR frame into the single-channel image handed to the
//! face detector: intensity conversion, 5x5 Gaussian smoothing, then histogram
//! equalization. With `backend-opencv` the chain runs through `imgproc`
//! (`cvtColor`, `GaussianBlur`, `equalizeHist`). Without it the portable
//! functions below produce the same bytes: Q14 luma, the fixed-point 5-tap
//! binomial kernel with reflect-101 borders, and `equalizeHist` rounding.

use anyhow::Result;

use crate::frame::{Frame, GrayImage, BGR_CHANNELS};

// BT.601 luma weights in Q14 fixed point (B, G, R).
const LUMA_B: u32 = 1868;
const LUMA_G: u32 = 9617;
const LUMA_R: u32 = 4899;
const LUMA_SHIFT: u32 = 14;

/// 5-tap binomial kernel, the Gaussian a 5x5 window yields when sigma is
/// derived from the kernel size.
const GAUSS_5: [u32; 5] = [1, 4, 6, 4, 1];
const GAUSS_5_SUM: u32 = 16;

/// Full detector preprocessing chain.
pub fn preprocess(frame: &Frame) -> Result<GrayImage> {
    if frame.is_empty() {
        return Ok(GrayImage::new(frame.width, frame.height));
    }
    #[cfg(feature = "backend-opencv")]
    {
        cv::preprocess(frame)
    }
    #[cfg(not(feature = "backend-opencv"))]
    {
        Ok(preprocess_portable(frame))
    }
}

/// The preprocessing chain without OpenCV.
pub fn preprocess_portable(frame: &Frame) -> GrayImage {
    let gray = to_gray(frame);
    let blurred = gaussian_blur_5x5(&gray);
    equalize_histogram(&blurred)
}

/// Convert BGR8 to 8-bit intensity.
pub fn to_gray(frame: &Frame) -> GrayImage {
    let mut out = GrayImage::new(frame.width, frame.height);
    let dst = out.as_bytes_mut();
    for (px, y) in frame
        .bgr_bytes()
        .chunks_exact(BGR_CHANNELS)
        .zip(dst.iter_mut())
    {
        let b = px[0] as u32;
        let g = px[1] as u32;
        let r = px[2] as u32;
        let luma = (b * LUMA_B + g * LUMA_G + r * LUMA_R + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT;
        *y = luma.min(255) as u8;
    }
    out
}

/// Separable 5x5 Gaussian blur with reflect-101 borders.
pub fn gaussian_blur_5x5(src: &GrayImage) -> GrayImage {
    let width = src.width() as usize;
    let height = src.height() as usize;
    if width == 0 || height == 0 {
        return src.clone();
    }

    let input = src.as_bytes();
    let mut horizontal = vec![0u32; width * height];
    for y in 0..height {
        let row = &input[y * width..(y + 1) * width];
        for x in 0..width {
            let mut acc = 0u32;
            for (k, weight) in GAUSS_5.iter().enumerate() {
                let sx = reflect_101(x as isize + k as isize - 2, width);
                acc += row[sx] as u32 * weight;
            }
            horizontal[y * width + x] = acc;
        }
    }

    let norm = GAUSS_5_SUM * GAUSS_5_SUM;
    let mut out = GrayImage::new(src.width(), src.height());
    let dst = out.as_bytes_mut();
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0u32;
            for (k, weight) in GAUSS_5.iter().enumerate() {
                let sy = reflect_101(y as isize + k as isize - 2, height);
                acc += horizontal[sy * width + x] * weight;
            }
            dst[y * width + x] = ((acc + norm / 2) / norm).min(255) as u8;
        }
    }
    out
}

/// Histogram equalization, as `equalizeHist` computes it.
///
/// The lowest occupied intensity maps to 0 and the CDF of the remaining bins is
/// stretched over 0..=255 with an `f32` scale and round-half-to-even. An image
/// with a single intensity is returned as-is.
pub fn equalize_histogram(src: &GrayImage) -> GrayImage {
    let total = src.as_bytes().len();
    if total == 0 {
        return src.clone();
    }

    let mut hist = [0usize; 256];
    for &v in src.as_bytes() {
        hist[v as usize] += 1;
    }

    let first = hist.iter().position(|&count| count > 0).unwrap_or(0);
    if hist[first] == total {
        return src.clone();
    }

    let scale = 255.0f32 / (total - hist[first]) as f32;
    let mut lut = [0u8; 256];
    let mut sum = 0usize;
    for level in (first + 1)..256 {
        sum += hist[level];
        lut[level] = (sum as f32 * scale).round_ties_even().clamp(0.0, 255.0) as u8;
    }

    let mut out = src.clone();
    for v in out.as_bytes_mut() {
        *v = lut[*v as usize];
    }
    out
}

fn reflect_101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let len = len as isize;
    let mut i = i;
    // Kernel radius is 2, so one reflection suffices for len >= 2.
    if i < 0 {
        i = -i;
    }
    if i >= len {
        i = 2 * len - 2 - i;
    }
    i.clamp(0, len - 1) as usize
}

#[cfg(feature = "backend-opencv")]
mod cv {
    use anyhow::Result;
    use opencv::{
        core::{self, Mat, Scalar, Size},
        imgproc,
        prelude::*,
    };

    use crate::frame::{Frame, GrayImage};

    pub fn preprocess(frame: &Frame) -> Result<GrayImage> {
        let bgr = upload_bgr(frame)?;
        let mut gray = Mat::default();
        imgproc::cvt_color(&bgr, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;
        let mut blurred = Mat::default();
        imgproc::gaussian_blur(
            &gray,
            &mut blurred,
            Size::new(5, 5),
            0.0,
            0.0,
            core::BORDER_DEFAULT,
        )?;
        let mut equalized = Mat::default();
        imgproc::equalize_hist(&blurred, &mut equalized)?;
        GrayImage::from_raw(frame.width, frame.height, equalized.data_bytes()?.to_vec())
    }

    fn upload_bgr(frame: &Frame) -> Result<Mat> {
        let mut mat = Mat::new_rows_cols_with_default(
            frame.height as i32,
            frame.width as i32,
            core::CV_8UC3,
            Scalar::all(0.0),
        )?;
        mat.data_bytes_mut()?.copy_from_slice(frame.bgr_bytes());
        Ok(mat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_uses_bt601_weights() {
        let blue = Frame::filled(1, 1, [255, 0, 0], 1);
        let green = Frame::filled(1, 1, [0, 255, 0], 1);
        let red = Frame::filled(1, 1, [0, 0, 255], 1);
        let white = Frame::filled(1, 1, [255, 255, 255], 1);
        assert_eq!(to_gray(&blue).get(0, 0), 29);
        assert_eq!(to_gray(&green).get(0, 0), 150);
        assert_eq!(to_gray(&red).get(0, 0), 76);
        assert_eq!(to_gray(&white).get(0, 0), 255);
    }

    #[test]
    fn blur_keeps_uniform_image() {
        let img = GrayImage::from_fn(9, 7, |_, _| 90);
        assert_eq!(gaussian_blur_5x5(&img), img);
    }

    #[test]
    fn blur_spreads_single_bright_pixel() {
        let img = GrayImage::from_fn(9, 9, |x, y| if x == 4 && y == 4 { 255 } else { 0 });
        let out = gaussian_blur_5x5(&img);
        // Kernel weights over 256, rounded half up: 36, 24, 16, 6, 1.
        assert_eq!(out.get(4, 4), 36);
        assert_eq!(out.get(3, 4), 24);
        assert_eq!(out.get(3, 3), 16);
        assert_eq!(out.get(2, 4), 6);
        assert_eq!(out.get(2, 2), 1);
        assert_eq!(out.get(0, 0), 0);
        assert_eq!(out.get(4, 1), 0);
    }

    #[test]
    fn blur_handles_tiny_images() {
        let img = GrayImage::from_fn(1, 1, |_, _| 200);
        assert_eq!(gaussian_blur_5x5(&img).get(0, 0), 200);
        let img = GrayImage::from_fn(2, 1, |x, _| if x == 0 { 0 } else { 160 });
        let out = gaussian_blur_5x5(&img);
        assert_eq!(out.width(), 2);
    }

    #[test]
    fn equalize_stretches_two_levels_to_full_range() {
        let img = GrayImage::from_fn(4, 4, |x, _| if x < 2 { 100 } else { 120 });
        let out = equalize_histogram(&img);
        assert_eq!(out.get(0, 0), 0);
        assert_eq!(out.get(3, 3), 255);
    }

    #[test]
    fn equalize_rounds_half_to_even() {
        // 510 pixels above the lowest level: scale is exactly 0.5.
        let mut data = vec![2u8; 511];
        data[0] = 0;
        data[1] = 1;
        let out = equalize_histogram(&GrayImage::from_raw(511, 1, data).unwrap());
        assert_eq!(out.get(0, 0), 0);
        assert_eq!(out.get(1, 0), 0);
        assert_eq!(out.get(2, 0), 255);

        // 170 pixels above the lowest level: scale is exactly 1.5.
        let mut data = vec![40u8; 171];
        data[0] = 10;
        data[1] = 20;
        data[2] = 30;
        data[3] = 30;
        let out = equalize_histogram(&GrayImage::from_raw(171, 1, data).unwrap());
        assert_eq!(out.get(0, 0), 0);
        assert_eq!(out.get(1, 0), 2);
        assert_eq!(out.get(2, 0), 4);
        assert_eq!(out.get(4, 0), 255);
    }

    #[test]
    fn equalize_leaves_flat_image_unchanged() {
        let img = GrayImage::from_fn(5, 5, |_, _| 42);
        assert_eq!(equalize_histogram(&img), img);
    }

    #[test]
    fn equalize_is_monotonic() {
        let img = GrayImage::from_fn(16, 16, |x, y| ((x * 3 + y) % 64) as u8 + 40);
        let out = equalize_histogram(&img);
        for a in 0..16 {
            for b in 0..16 {
                if img.get(a, 0) < img.get(b, 0) {
                    assert!(out.get(a, 0) <= out.get(b, 0));
                }
            }
        }
    }

    #[test]
    fn preprocess_output_matches_frame_size() {
        let frame = Frame::filled(32, 24, [10, 20, 30], 1);
        let gray = preprocess(&frame).unwrap();
        assert_eq!((gray.width(), gray.height()), (32, 24));

        let empty = Frame::filled(0, 0, [0, 0, 0], 1);
        let gray = preprocess(&empty).unwrap();
        assert_eq!((gray.width(), gray.height()), (0, 0));
    }

    #[cfg(feature = "backend-opencv")]
    #[test]
    fn portable_chain_matches_imgproc() {
        let mut data = Vec::with_capacity(37 * 29 * BGR_CHANNELS);
        for i in 0..37 * 29 * BGR_CHANNELS {
            data.push(((i * 7919 + (i / 37) * 131) % 251) as u8);
        }
        let frame = Frame::from_bgr(data, 37, 29, 1).unwrap();
        assert_eq!(cv::preprocess(&frame).unwrap(), preprocess_portable(&frame));
    }
}
