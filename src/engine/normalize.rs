// src/engine/normalize.rs
//
// Color Normalizer: any decoded buffer -> single-channel 8-bit gray with
// transparency fully resolved.
//
// One detection logic for both pipelines. An opaque RGB image composited
// onto white is bit-identical to its plain luma conversion, so unifying on
// the fuller transparency detection cannot change overlapping cases.

use crate::engine::decoder::{ColorMode, DecodedImage};
use crate::engine::BACKGROUND_WHITE;
use image::{DynamicImage, GrayImage};

/// BT.601 luma in 16-bit fixed point, round to nearest.
/// Weights sum to exactly 65536, so gray inputs (r == g == b) map to
/// themselves.
#[inline]
pub(crate) fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((19595 * r as u32 + 38470 * g as u32 + 7471 * b as u32 + 32768) >> 16) as u8
}

/// "Over" compositing of one channel onto the white background,
/// alpha in 0..=255, round to nearest. a=0 yields 255, a=255 yields c.
#[inline]
fn over_white(c: u8, a: u8) -> u8 {
    let bg = BACKGROUND_WHITE[0] as u32;
    ((c as u32 * a as u32 + bg * (255 - a as u32) + 127) / 255) as u8
}

/// Flatten a decoded image to single-channel grayscale.
///
/// Three cases:
/// (a) already gray with no transparency: pass through unchanged
/// (b) carries transparency (alpha channel, palette, or tRNS metadata):
///     composite every pixel onto white, then reduce to luma
/// (c) opaque multi-channel: reduce to luma directly
pub fn flatten_to_gray(decoded: DecodedImage) -> GrayImage {
    if decoded.mode == ColorMode::Gray && !decoded.carries_transparency() {
        return decoded.image.into_luma8();
    }

    if decoded.carries_transparency() {
        // Palette images were expanded to RGB/RGBA at decode; GrayAlpha
        // expands losslessly here (luma of r==g==b is the identity).
        let rgba = decoded.image.into_rgba8();
        let (width, height) = rgba.dimensions();
        let mut gray = GrayImage::new(width, height);
        for (src, dst) in rgba.pixels().zip(gray.pixels_mut()) {
            let [r, g, b, a] = src.0;
            dst.0 = [luma(over_white(r, a), over_white(g, a), over_white(b, a))];
        }
        return gray;
    }

    // Opaque multi-channel
    let rgb = decoded.image.into_rgb8();
    let (width, height) = rgb.dimensions();
    let mut gray = GrayImage::new(width, height);
    for (src, dst) in rgb.pixels().zip(gray.pixels_mut()) {
        let [r, g, b] = src.0;
        dst.0 = [luma(r, g, b)];
    }
    gray
}
