// src/engine/resize.rs
//
// Resampler: Lanczos3 resize of single-channel grayscale buffers.
//
// The buffer stays PixelType::U8 end to end: no channel reinterpretation,
// and no alpha premultiply (grayscale is opaque by invariant here).

use crate::error::{EinkImageError, Result};
use fast_image_resize::{self as fir, ImageBufferError, PixelType, ResizeOptions};
use image::GrayImage;

fn lanczos3_options() -> ResizeOptions {
    ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3))
}

/// Resize a grayscale buffer to exactly `dst_width` x `dst_height`.
pub fn resize_gray(src: GrayImage, dst_width: u32, dst_height: u32) -> Result<GrayImage> {
    let src_width = src.width();
    let src_height = src.height();

    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return Err(EinkImageError::resize_failed(
            (src_width, src_height),
            (dst_width, dst_height),
            "invalid dimensions for resize",
        ));
    }

    let mut src_pixels = src.into_raw();
    resize_internal(src_width, src_height, &mut src_pixels, dst_width, dst_height).map_err(
        |reason| {
            EinkImageError::resize_failed(
                (src_width, src_height),
                (dst_width, dst_height),
                reason,
            )
        },
    )
}

fn resize_internal(
    src_width: u32,
    src_height: u32,
    src_pixels: &mut [u8],
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<GrayImage, String> {
    let required_bytes = (src_width as usize)
        .checked_mul(src_height as usize)
        .ok_or_else(|| "image dimensions overflow during resize".to_string())?;
    if src_pixels.len() < required_bytes {
        return Err(format!(
            "fir source image invalid buffer size. expected {required_bytes} bytes, got {} bytes",
            src_pixels.len()
        ));
    }

    let primary_result =
        match fir::images::Image::from_slice_u8(src_width, src_height, src_pixels, PixelType::U8) {
            Ok(src_image) => resize_with_source_image(src_image, dst_width, dst_height),
            Err(ImageBufferError::InvalidBufferAlignment) => {
                let aligned =
                    copy_pixels_to_aligned_image(src_width, src_height, src_pixels, required_bytes)?;
                resize_with_source_image(aligned, dst_width, dst_height)
            }
            Err(other) => Err(format!("fir source image error: {other:?}")),
        };

    match primary_result {
        Ok(img) => Ok(img),
        Err(err) => resize_with_image_crate_fallback(
            src_pixels,
            src_width,
            src_height,
            dst_width,
            dst_height,
        )
        .map_err(|fallback_err| format!("{err}; image crate fallback failed: {fallback_err}")),
    }
}

fn copy_pixels_to_aligned_image(
    width: u32,
    height: u32,
    src_pixels: &[u8],
    required_bytes: usize,
) -> std::result::Result<fir::images::Image<'static>, String> {
    let mut aligned_image = fir::images::Image::new(width, height, PixelType::U8);
    let aligned_buffer = aligned_image.buffer_mut();
    if aligned_buffer.len() != required_bytes {
        return Err(format!(
            "fir alignment fallback buffer mismatch. expected {required_bytes} bytes, got {} bytes",
            aligned_buffer.len()
        ));
    }
    aligned_buffer.copy_from_slice(&src_pixels[..required_bytes]);
    Ok(aligned_image)
}

fn resize_with_source_image(
    src_image: fir::images::Image<'_>,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<GrayImage, String> {
    let mut dst_image = fir::images::Image::new(dst_width, dst_height, PixelType::U8);

    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, &lanczos3_options())
        .map_err(|e| format!("fir resize error: {e:?}"))?;

    GrayImage::from_raw(dst_width, dst_height, dst_image.into_vec())
        .ok_or_else(|| "failed to create gray image from resized data".to_string())
}

fn resize_with_image_crate_fallback(
    src_pixels: &[u8],
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<GrayImage, String> {
    let gray = GrayImage::from_raw(src_width, src_height, src_pixels.to_vec())
        .ok_or_else(|| "failed to build gray image for fallback resize".to_string())?;
    Ok(image::imageops::resize(
        &gray,
        dst_width,
        dst_height,
        image::imageops::FilterType::Lanczos3,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_resize_exact_target_dimensions() {
        let src = GrayImage::from_fn(1000, 1200, |x, y| Luma([((x + y) % 256) as u8]));
        let out = resize_gray(src, 600, 800).unwrap();
        assert_eq!(out.dimensions(), (600, 800));
    }

    #[test]
    fn test_resize_upscale() {
        let src = GrayImage::from_pixel(2, 2, Luma([77]));
        let out = resize_gray(src, 600, 800).unwrap();
        assert_eq!(out.dimensions(), (600, 800));
        // Constant image stays constant through a convolution filter
        assert!(out.pixels().all(|p| p.0[0] == 77));
    }

    #[test]
    fn test_resize_zero_dimension_errors() {
        let src = GrayImage::from_pixel(2, 2, Luma([0]));
        let err = resize_gray(src, 0, 800).unwrap_err();
        assert!(matches!(err, EinkImageError::ResizeFailed { .. }));
    }

    #[test]
    fn test_resize_1x1() {
        let src = GrayImage::from_pixel(1, 1, Luma([200]));
        let out = resize_gray(src, 600, 800).unwrap();
        assert_eq!(out.dimensions(), (600, 800));
        assert_eq!(out.get_pixel(300, 400).0, [200]);
    }
}
