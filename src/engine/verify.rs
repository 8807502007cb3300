// src/engine/verify.rs
//
// Compatibility Checker: read-only inspection of a file against the e-ink
// display constraints. Never mutates or re-encodes.
//
// Four independent criteria, reported individually and as a conjunction:
// resolution, color mode, container format, absence of alpha/transparency.

use crate::engine::{TARGET_HEIGHT, TARGET_WIDTH};
use crate::error::{EinkImageError, Result};
use image::ImageFormat;
use std::io::Cursor;
use std::path::Path;

use super::decoder::{detect_format, ColorMode};

/// Per-criterion verdicts for one checked file. Constructed once, never
/// mutated afterwards.
#[derive(Clone, Debug)]
pub struct CompatibilityReport {
    pub target_resolution: (u32, u32),
    pub observed_resolution: (u32, u32),
    /// Required mode is always single-channel gray
    pub observed_mode: ColorMode,
    pub observed_bit_depth: u8,
    pub target_format: ImageFormat,
    pub observed_format: Option<ImageFormat>,
    /// Alpha channel present, or transparency signaled via metadata
    pub alpha_present: bool,
}

impl CompatibilityReport {
    pub fn resolution_ok(&self) -> bool {
        self.observed_resolution == self.target_resolution
    }

    pub fn mode_ok(&self) -> bool {
        self.observed_mode == ColorMode::Gray && self.observed_bit_depth == 8
    }

    pub fn format_ok(&self) -> bool {
        self.observed_format == Some(self.target_format)
    }

    pub fn alpha_ok(&self) -> bool {
        !self.alpha_present
    }

    /// Overall verdict: conjunction of all four criteria.
    pub fn is_compatible(&self) -> bool {
        self.resolution_ok() && self.mode_ok() && self.format_ok() && self.alpha_ok()
    }
}

/// Inspect a file on disk against the display constraints.
pub fn verify_file(path: &Path) -> Result<CompatibilityReport> {
    let data = std::fs::read(path)
        .map_err(|e| EinkImageError::file_read_failed(path.to_string_lossy().into_owned(), e))?;
    verify_bytes(&data)
}

/// Inspect encoded bytes against the display constraints.
///
/// PNG files are judged from the header alone (no pixel decode); other
/// formats are decoded enough to report their observed properties, though
/// they always fail the container criterion.
pub fn verify_bytes(data: &[u8]) -> Result<CompatibilityReport> {
    let observed_format = detect_format(data);
    match observed_format {
        Some(ImageFormat::Png) => inspect_png_header(data),
        other => inspect_with_image_crate(data, other),
    }
}

fn inspect_png_header(data: &[u8]) -> Result<CompatibilityReport> {
    let decoder = png::Decoder::new(Cursor::new(data));
    let reader = decoder
        .read_info()
        .map_err(|e| EinkImageError::decode_failed(format!("png: failed to read header: {e}")))?;
    let info = reader.info();

    let observed_mode = match info.color_type {
        png::ColorType::Grayscale => ColorMode::Gray,
        png::ColorType::GrayscaleAlpha => ColorMode::GrayAlpha,
        png::ColorType::Rgb => ColorMode::Rgb,
        png::ColorType::Rgba => ColorMode::Rgba,
        png::ColorType::Indexed => ColorMode::Palette,
    };
    let alpha_present = observed_mode.has_alpha_channel() || info.trns.is_some();

    Ok(CompatibilityReport {
        target_resolution: (TARGET_WIDTH, TARGET_HEIGHT),
        observed_resolution: (info.width, info.height),
        observed_mode,
        observed_bit_depth: info.bit_depth as u8,
        target_format: ImageFormat::Png,
        observed_format: Some(ImageFormat::Png),
        alpha_present,
    })
}

fn inspect_with_image_crate(
    data: &[u8],
    observed_format: Option<ImageFormat>,
) -> Result<CompatibilityReport> {
    let img = image::load_from_memory(data)
        .map_err(|e| EinkImageError::decode_failed(format!("decode failed: {e}")))?;
    let color = img.color();

    let observed_mode = if color.has_alpha() {
        if color.has_color() {
            ColorMode::Rgba
        } else {
            ColorMode::GrayAlpha
        }
    } else if color.has_color() {
        ColorMode::Rgb
    } else {
        ColorMode::Gray
    };

    Ok(CompatibilityReport {
        target_resolution: (TARGET_WIDTH, TARGET_HEIGHT),
        observed_resolution: (img.width(), img.height()),
        observed_mode,
        observed_bit_depth: (color.bits_per_pixel() / color.channel_count() as u16) as u8,
        target_format: ImageFormat::Png,
        observed_format,
        alpha_present: color.has_alpha(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_compatible_gray_600x800() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(600, 800, Luma([120])));
        let report = verify_bytes(&png_bytes(img)).unwrap();
        assert!(report.resolution_ok());
        assert!(report.mode_ok());
        assert!(report.format_ok());
        assert!(report.alpha_ok());
        assert!(report.is_compatible());
    }

    #[test]
    fn test_wrong_resolution_fails_only_that_criterion() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(100, 100, Luma([120])));
        let report = verify_bytes(&png_bytes(img)).unwrap();
        assert!(!report.resolution_ok());
        assert!(report.mode_ok());
        assert!(report.format_ok());
        assert!(report.alpha_ok());
        assert!(!report.is_compatible());
    }

    #[test]
    fn test_rgba_fails_mode_and_alpha() {
        let img =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(600, 800, Rgba([1, 2, 3, 200])));
        let report = verify_bytes(&png_bytes(img)).unwrap();
        assert!(report.resolution_ok());
        assert!(!report.mode_ok());
        assert!(!report.alpha_ok());
        assert_eq!(report.observed_mode, ColorMode::Rgba);
        assert!(!report.is_compatible());
    }

    #[test]
    fn test_jpeg_fails_format_criterion() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(600, 800, Luma([99])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .unwrap();
        let report = verify_bytes(&buf).unwrap();
        assert!(!report.format_ok());
        assert_eq!(report.observed_format, Some(ImageFormat::Jpeg));
        assert!(report.resolution_ok());
        assert!(!report.is_compatible());
    }

    #[test]
    fn test_trns_metadata_counts_as_alpha() {
        // Gray PNG with a tRNS chunk: layout has no alpha channel but the
        // side-channel transparency must still fail the alpha criterion
        let mut buf = Vec::new();
        {
            let mut encoder = png::Encoder::new(Cursor::new(&mut buf), 600, 800);
            encoder.set_color(png::ColorType::Grayscale);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_trns(vec![0u8, 0u8]);
            let mut writer = encoder.write_header().unwrap();
            writer
                .write_image_data(&vec![128u8; 600 * 800])
                .unwrap();
        }
        let report = verify_bytes(&buf).unwrap();
        assert!(report.mode_ok());
        assert!(!report.alpha_ok());
        assert!(!report.is_compatible());
    }

    #[test]
    fn test_verify_missing_file_errors() {
        let err = verify_file(Path::new("/no/such/file.png")).unwrap_err();
        assert!(matches!(err, EinkImageError::FileReadFailed { .. }));
    }
}
