//! Image preprocessing ahead of OCR
//!
//! Grayscale, contrast stretch, and a soft binarization that keeps
//! mid-tones instead of thresholding hard, which loses thin diacritics.

use crate::error::{Result, ScreenerError};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat};
use std::io::Cursor;

/// Target dimensions for OCR: largest edge capped at `max_edge`, aspect
/// ratio preserved, small images upscaled at most 2x.
pub fn bounded_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    let longest = width.max(height) as f64;
    let scale = (max_edge as f64 / longest).min(2.0);
    if (scale - 1.0).abs() < f64::EPSILON {
        return (width, height);
    }
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// Prepares a decoded image for OCR: bounded resize, grayscale, contrast
/// stretch to the 1st..99th percentile range, soft binarization.
pub fn enhance_for_ocr(img: &DynamicImage, max_edge: u32) -> GrayImage {
    let (w, h) = bounded_dimensions(img.width(), img.height(), max_edge);
    let resized = if (w, h) == (img.width(), img.height()) {
        img.clone()
    } else {
        img.resize_exact(w, h, FilterType::Lanczos3)
    };

    let mut gray = resized.to_luma8();
    let (low, high) = percentile_range(&gray, 0.01, 0.99);
    let span = (high - low).max(1) as f32;

    for pixel in gray.pixels_mut() {
        let stretched = ((pixel.0[0] as i32 - low) as f32 / span * 255.0).clamp(0.0, 255.0);
        pixel.0[0] = soft_binarize(stretched);
    }
    gray
}

/// Decodes image bytes, enhances, and re-encodes as PNG for the OCR
/// providers.
pub fn preprocess_image_bytes(bytes: &[u8], max_edge: u32) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| ScreenerError::ImageDecoding(e.to_string()))?;
    let enhanced = enhance_for_ocr(&img, max_edge);
    encode_png(&enhanced)
}

pub fn encode_png(gray: &GrayImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    gray.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| ScreenerError::ImageDecoding(e.to_string()))?;
    Ok(out.into_inner())
}

fn percentile_range(gray: &GrayImage, lo: f64, hi: f64) -> (i32, i32) {
    let mut histogram = [0u32; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }
    let total: u64 = histogram.iter().map(|&c| c as u64).sum();
    if total == 0 {
        return (0, 255);
    }

    let lo_count = (total as f64 * lo) as u64;
    let hi_count = (total as f64 * hi) as u64;
    let mut low = 0i32;
    let mut high = 255i32;
    let mut seen = 0u64;
    for (value, &count) in histogram.iter().enumerate() {
        let next = seen + count as u64;
        if seen <= lo_count && lo_count < next {
            low = value as i32;
        }
        if seen <= hi_count && hi_count < next {
            high = value as i32;
        }
        seen = next;
    }
    if high <= low {
        (0, 255)
    } else {
        (low, high)
    }
}

/// Pushes near-black and near-white pixels to the rails while keeping a
/// linear ramp in between.
fn soft_binarize(value: f32) -> u8 {
    const DARK: f32 = 64.0;
    const LIGHT: f32 = 192.0;
    if value <= DARK {
        0
    } else if value >= LIGHT {
        255
    } else {
        (((value - DARK) / (LIGHT - DARK)) * 255.0).round() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_bounded_dimensions_downscale() {
        assert_eq!(bounded_dimensions(4000, 2000, 2048), (2048, 1024));
    }

    #[test]
    fn test_bounded_dimensions_caps_upscale_at_two_x() {
        // 300x200 with a 2048 edge cap would scale 6.8x; capped at 2x.
        assert_eq!(bounded_dimensions(300, 200, 2048), (600, 400));
    }

    #[test]
    fn test_bounded_dimensions_identity_under_cap() {
        assert_eq!(bounded_dimensions(2048, 1024, 2048), (2048, 1024));
    }

    #[test]
    fn test_soft_binarize_rails() {
        assert_eq!(soft_binarize(10.0), 0);
        assert_eq!(soft_binarize(250.0), 255);
        let mid = soft_binarize(128.0);
        assert!(mid > 0 && mid < 255);
    }

    #[test]
    fn test_enhance_stretches_low_contrast_scan() {
        // A washed-out scan: text at 110, background at 150.
        let mut img = GrayImage::from_pixel(64, 64, Luma([150u8]));
        for y in 20..44 {
            for x in 10..50 {
                img.put_pixel(x, y, Luma([110u8]));
            }
        }
        // Edge cap equal to the image size keeps the pixel grid intact.
        let enhanced = enhance_for_ocr(&DynamicImage::ImageLuma8(img), 64);
        let text = enhanced.get_pixel(20, 32).0[0];
        let background = enhanced.get_pixel(0, 0).0[0];
        assert!(background > text);
        assert!(background as i32 - text as i32 > 150);
    }

    #[test]
    fn test_preprocess_roundtrip_produces_png() {
        let img = GrayImage::from_pixel(32, 32, Luma([128u8]));
        let png = encode_png(&img).unwrap();
        let processed = preprocess_image_bytes(&png, 2048).unwrap();
        assert!(processed.starts_with(&[0x89, b'P', b'N', b'G']));
    }
}
