// src/engine/encoder.rs
//
// Encoder: grayscale buffer -> lossless PNG at maximum compression,
// plus the atomic file write used by the orchestrators.

use crate::error::{EinkImageError, Result};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, GrayImage, ImageEncoder};
use std::io::Write;
use std::path::Path;

/// Encode a grayscale buffer as 8-bit single-channel PNG.
///
/// The image crate writes at its best compression level, then oxipng
/// recompresses losslessly and strips removable chunks. Output never
/// carries an alpha channel or a tRNS chunk.
pub fn encode_png(gray: &GrayImage) -> Result<Vec<u8>> {
    let (width, height) = gray.dimensions();
    let mut buf = Vec::new();
    PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive)
        .write_image(gray.as_raw(), width, height, ExtendedColorType::L8)
        .map_err(|e| EinkImageError::encode_failed("png", format!("PNG encode failed: {e}")))?;

    let mut options = oxipng::Options::from_preset(4);
    options.strip = oxipng::StripChunks::Safe;
    // The output contract is 8-bit grayscale; keep oxipng from rewriting
    // flat images as indexed or sub-8-bit PNGs.
    options.bit_depth_reduction = false;
    options.color_type_reduction = false;
    options.palette_reduction = false;
    options.grayscale_reduction = false;

    oxipng::optimize_from_memory(&buf, &options).map_err(|e| {
        EinkImageError::encode_failed("png", format!("oxipng optimization failed: {e}"))
    })
}

/// Write encoded bytes to `path` atomically: a temp file in the destination
/// directory is persisted over the final path only after a complete write.
/// A failed encode or write never leaves a partial file at `path`.
pub fn write_png_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let display_path = || path.to_string_lossy().into_owned();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| EinkImageError::file_write_failed(display_path(), e))?;
    tmp.write_all(data)
        .map_err(|e| EinkImageError::file_write_failed(display_path(), e))?;
    tmp.flush()
        .map_err(|e| EinkImageError::file_write_failed(display_path(), e))?;
    tmp.persist(path)
        .map_err(|e| EinkImageError::file_write_failed(display_path(), e.error))?;
    Ok(())
}
