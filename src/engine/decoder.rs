// src/engine/decoder.rs
//
// Decode into a mode-tagged pixel buffer.
//
// The color mode is resolved exactly once, here. Downstream stages dispatch
// on the tag and never re-inspect container quirks (palette indices, tRNS
// side-channel transparency).

use crate::error::EinkImageError;
use image::{
    DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, ImageReader, RgbImage, RgbaImage,
};
use std::io::Cursor;

use crate::engine::{MAX_DIMENSION, MAX_PIXELS};

type DecoderResult<T> = std::result::Result<T, EinkImageError>;

/// Source color layout, as reported by the container.
///
/// `Palette` and `transparency_metadata` survive decoding even though the
/// pixel data is expanded to an explicit channel layout, because the
/// normalizer treats both as "carries transparency".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMode {
    /// Single-channel 8-bit gray
    Gray,
    /// Gray + alpha channel
    GrayAlpha,
    /// Opaque three-channel color
    Rgb,
    /// Color + alpha channel
    Rgba,
    /// Indexed palette (pixels arrive expanded to RGB or RGBA)
    Palette,
}

impl ColorMode {
    /// True when the layout itself carries an alpha channel.
    pub fn has_alpha_channel(&self) -> bool {
        matches!(self, ColorMode::GrayAlpha | ColorMode::Rgba)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorMode::Gray => "gray",
            ColorMode::GrayAlpha => "gray+alpha",
            ColorMode::Rgb => "rgb",
            ColorMode::Rgba => "rgb+alpha",
            ColorMode::Palette => "palette",
        }
    }
}

/// A decoded image plus the metadata the pipeline dispatches on.
///
/// Pixels are always 8-bit with palettes expanded; the tag records what the
/// container *said* the image was.
#[derive(Debug)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub mode: ColorMode,
    /// tRNS chunk present: transparency signaled outside the channel layout
    pub transparency_metadata: bool,
    pub format: Option<ImageFormat>,
}

impl DecodedImage {
    /// Whether any pixel may be non-opaque: an alpha channel, a palette
    /// (palette entries may map to transparent colors), or side-channel
    /// transparency metadata.
    pub fn carries_transparency(&self) -> bool {
        self.mode.has_alpha_channel()
            || self.mode == ColorMode::Palette
            || self.transparency_metadata
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// Detect input format using magic bytes. Returns None if unknown.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Decode PNG via the png crate, preserving the source color type.
///
/// EXPAND + STRIP_16 normalizes the pixel data (palette -> RGB/RGBA,
/// tRNS -> alpha, 16-bit -> 8-bit) while `Info` still reports the original
/// color type and tRNS chunk, which is exactly what the mode tag needs.
fn decode_png(data: &[u8]) -> DecoderResult<DecodedImage> {
    let mut decoder = png::Decoder::new(Cursor::new(data));
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let mut reader = decoder
        .read_info()
        .map_err(|e| EinkImageError::decode_failed(format!("png: failed to read header: {e}")))?;

    let (width, height, source_color, transparency_metadata) = {
        let info = reader.info();
        (
            info.width,
            info.height,
            info.color_type,
            info.trns.is_some(),
        )
    };
    check_dimensions(width, height)?;

    let mode = match source_color {
        png::ColorType::Grayscale => ColorMode::Gray,
        png::ColorType::GrayscaleAlpha => ColorMode::GrayAlpha,
        png::ColorType::Rgb => ColorMode::Rgb,
        png::ColorType::Rgba => ColorMode::Rgba,
        png::ColorType::Indexed => ColorMode::Palette,
    };

    let mut buf = vec![0u8; reader.output_buffer_size()];
    let frame = reader
        .next_frame(&mut buf)
        .map_err(|e| EinkImageError::decode_failed(format!("png: decode failed: {e}")))?;
    buf.truncate(frame.buffer_size());

    let (output_color, output_depth) = reader.output_color_type();
    if output_depth != png::BitDepth::Eight {
        return Err(EinkImageError::decode_failed(
            "png: expected 8-bit samples after normalization",
        ));
    }

    let image = match output_color {
        png::ColorType::Grayscale => GrayImage::from_raw(width, height, buf)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(|| EinkImageError::decode_failed("png: failed to build gray image"))?,
        png::ColorType::GrayscaleAlpha => GrayAlphaImage::from_raw(width, height, buf)
            .map(DynamicImage::ImageLumaA8)
            .ok_or_else(|| {
                EinkImageError::decode_failed("png: failed to build gray+alpha image")
            })?,
        png::ColorType::Rgb => RgbImage::from_raw(width, height, buf)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| EinkImageError::decode_failed("png: failed to build RGB image"))?,
        png::ColorType::Rgba => RgbaImage::from_raw(width, height, buf)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(|| EinkImageError::decode_failed("png: failed to build RGBA image"))?,
        png::ColorType::Indexed => {
            // EXPAND always de-palettizes; reaching this is a png crate bug
            return Err(EinkImageError::internal_panic(
                "png: palette not expanded by EXPAND transformation",
            ));
        }
    };

    Ok(DecodedImage {
        image,
        mode,
        transparency_metadata,
        format: Some(ImageFormat::Png),
    })
}

/// Decode non-PNG formats via the image crate.
///
/// These containers have no tRNS-style side channel; the mode derives from
/// the decoded variant, with exotic depths folded down to 8-bit.
fn decode_with_image_crate(data: &[u8], format: ImageFormat) -> DecoderResult<DecodedImage> {
    ensure_dimensions_safe(data)?;
    let img = image::load_from_memory(data)
        .map_err(|e| EinkImageError::decode_failed(format!("decode failed: {e}")))?;
    check_dimensions(img.width(), img.height())?;

    let (mode, image) = match img {
        DynamicImage::ImageLuma8(g) => (ColorMode::Gray, DynamicImage::ImageLuma8(g)),
        DynamicImage::ImageLumaA8(ga) => (ColorMode::GrayAlpha, DynamicImage::ImageLumaA8(ga)),
        DynamicImage::ImageRgb8(rgb) => (ColorMode::Rgb, DynamicImage::ImageRgb8(rgb)),
        DynamicImage::ImageRgba8(rgba) => (ColorMode::Rgba, DynamicImage::ImageRgba8(rgba)),
        other => {
            let color = other.color();
            if color.has_alpha() {
                (ColorMode::Rgba, DynamicImage::ImageRgba8(other.to_rgba8()))
            } else if color.has_color() {
                (ColorMode::Rgb, DynamicImage::ImageRgb8(other.to_rgb8()))
            } else {
                (ColorMode::Gray, DynamicImage::ImageLuma8(other.to_luma8()))
            }
        }
    };

    Ok(DecodedImage {
        image,
        mode,
        transparency_metadata: false,
        format: Some(format),
    })
}

/// Unified decode entrypoint:
/// - Detect format once (magic bytes)
/// - Route PNG to the mode-preserving decoder, others to the image crate
/// - Unrecognized magic bytes are rejected before any decode attempt
pub fn decode_image(bytes: &[u8]) -> DecoderResult<DecodedImage> {
    match detect_format(bytes) {
        Some(ImageFormat::Png) => decode_png(bytes),
        Some(format) => decode_with_image_crate(bytes, format),
        None => Err(EinkImageError::unsupported_format("unknown")),
    }
}

/// Check if image dimensions are within safe limits.
/// Returns an error if the image is too large (potential decompression bomb).
pub fn check_dimensions(width: u32, height: u32) -> DecoderResult<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(EinkImageError::dimension_exceeds_limit(
            width.max(height),
            MAX_DIMENSION,
        ));
    }
    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
        return Err(EinkImageError::pixel_count_exceeds_limit(
            pixels, MAX_PIXELS,
        ));
    }
    Ok(())
}

/// Inspect encoded bytes and ensure the image dimensions are safe before decoding.
pub fn ensure_dimensions_safe(bytes: &[u8]) -> DecoderResult<()> {
    let cursor = Cursor::new(bytes);
    if let Ok(reader) = ImageReader::new(cursor).with_guessed_format() {
        if let Ok((width, height)) = reader.into_dimensions() {
            return check_dimensions(width, height);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn encode_png_rgb(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |_, _| Rgb([0, 0, 0]));
        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    /// 2-entry palette PNG: index 0 black, index 1 white.
    /// With `trns`, index 0 is fully transparent.
    fn encode_png_palette(width: u32, height: u32, trns: bool) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut encoder = png::Encoder::new(Cursor::new(&mut buffer), width, height);
            encoder.set_color(png::ColorType::Indexed);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_palette(vec![0, 0, 0, 255, 255, 255]);
            if trns {
                encoder.set_trns(vec![0u8]);
            }
            let mut writer = encoder.write_header().unwrap();
            let indices: Vec<u8> = (0..width * height).map(|i| (i % 2) as u8).collect();
            writer.write_image_data(&indices).unwrap();
        }
        buffer
    }

    #[test]
    fn test_ensure_dimensions_safe_allows_small_image() {
        let data = encode_png_rgb(64, 64);
        assert!(ensure_dimensions_safe(&data).is_ok());
    }

    #[test]
    fn test_check_dimensions_rejects_large_image() {
        let err = check_dimensions(MAX_DIMENSION + 1, 1).unwrap_err();
        assert!(matches!(err, EinkImageError::DimensionExceedsLimit { .. }));
        let err = check_dimensions(20_000, 20_000).unwrap_err();
        assert!(matches!(err, EinkImageError::PixelCountExceedsLimit { .. }));
    }

    #[test]
    fn test_decode_rgb_png_is_opaque() {
        let data = encode_png_rgb(3, 2);
        let decoded = decode_image(&data).unwrap();
        assert_eq!(decoded.mode, ColorMode::Rgb);
        assert!(!decoded.transparency_metadata);
        assert!(!decoded.carries_transparency());
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.format, Some(ImageFormat::Png));
    }

    #[test]
    fn test_decode_palette_png_keeps_palette_tag() {
        let data = encode_png_palette(4, 4, false);
        let decoded = decode_image(&data).unwrap();
        assert_eq!(decoded.mode, ColorMode::Palette);
        // Palette always routes through the compositing path
        assert!(decoded.carries_transparency());
        // Pixels arrive expanded to an explicit layout
        assert!(matches!(decoded.image, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn test_decode_palette_png_with_trns_expands_alpha() {
        let data = encode_png_palette(2, 2, true);
        let decoded = decode_image(&data).unwrap();
        assert_eq!(decoded.mode, ColorMode::Palette);
        assert!(decoded.transparency_metadata);
        let rgba = match &decoded.image {
            DynamicImage::ImageRgba8(rgba) => rgba,
            other => panic!("expected RGBA after tRNS expansion, got {other:?}"),
        };
        // Index 0 (black) is transparent, index 1 (white) opaque
        assert_eq!(rgba.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(rgba.get_pixel(1, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_decode_gray_png_roundtrip_mode() {
        let gray = GrayImage::from_fn(2, 2, |x, _| image::Luma([(x * 100) as u8]));
        let mut buffer = Vec::new();
        DynamicImage::ImageLuma8(gray)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        let decoded = decode_image(&buffer).unwrap();
        assert_eq!(decoded.mode, ColorMode::Gray);
        assert!(!decoded.carries_transparency());
    }

    #[test]
    fn test_decode_jpeg_routes_through_image_crate() {
        let jpeg = {
            let mut buf = Vec::new();
            DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([9, 8, 7])))
                .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
                .unwrap();
            buf
        };
        let decoded = decode_image(&jpeg).unwrap();
        assert_eq!(decoded.format, Some(ImageFormat::Jpeg));
        assert_eq!(decoded.mode, ColorMode::Rgb);
        assert_eq!(decoded.dimensions(), (2, 2));
    }

    #[test]
    fn test_decode_unknown_magic_bytes_is_unsupported_format() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, EinkImageError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_decode_truncated_png_is_decode_failure() {
        // Valid magic bytes route to the decoder; the failure is a decode
        // error, not an unsupported container
        let mut data = encode_png_rgb(32, 32);
        data.truncate(data.len() / 2);
        let err = decode_image(&data).unwrap_err();
        assert!(matches!(err, EinkImageError::DecodeFailed { .. }));
    }
}
