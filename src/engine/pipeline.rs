// src/engine/pipeline.rs
//
// Orchestrators. One runner composes the stages; the two public workflows
// differ only in the OptimizeProfile they pass (see src/ops.rs).
//
// Flow: read -> decode -> flatten to gray -> (resample) -> stretch ->
// encode (atomic write) -> (verify).

use crate::engine::contrast::autocontrast;
use crate::engine::decoder::decode_image;
use crate::engine::encoder::{encode_png, write_png_atomic};
use crate::engine::normalize::flatten_to_gray;
use crate::engine::resize::resize_gray;
use crate::engine::verify::{verify_file, CompatibilityReport};
use crate::error::{EinkImageError, Result};
use crate::ops::OptimizeProfile;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What one optimize run produced.
#[derive(Debug)]
pub struct OptimizeOutcome {
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub bytes_in: u64,
    pub bytes_out: u64,
    /// Present when the profile requested post-write verification
    pub report: Option<CompatibilityReport>,
}

impl OptimizeOutcome {
    /// Output size relative to input, as a signed percentage.
    pub fn size_change_percent(&self) -> f64 {
        if self.bytes_in == 0 {
            return 0.0;
        }
        (self.bytes_out as f64 - self.bytes_in as f64) / self.bytes_in as f64 * 100.0
    }
}

/// Derive the default output path: input base name + suffix, keeping the
/// original extension. `photo.png` -> `photo_eink_optimized.png`.
pub fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match input.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    input.with_file_name(file_name)
}

/// Run one optimize pipeline over a single file.
pub fn run_profile(
    input: &Path,
    output: Option<&Path>,
    profile: &OptimizeProfile,
) -> Result<OptimizeOutcome> {
    if !input.exists() {
        return Err(EinkImageError::file_not_found(
            input.to_string_lossy().into_owned(),
        ));
    }

    let data = std::fs::read(input)
        .map_err(|e| EinkImageError::file_read_failed(input.to_string_lossy().into_owned(), e))?;
    let bytes_in = data.len() as u64;

    let decoded = decode_image(&data)?;
    let (src_width, src_height) = decoded.dimensions();
    debug!(
        mode = decoded.mode.as_str(),
        width = src_width,
        height = src_height,
        transparency = decoded.carries_transparency(),
        "decoded input"
    );

    let mut gray = flatten_to_gray(decoded);

    if let Some((target_w, target_h)) = profile.resize_to {
        if gray.dimensions() != (target_w, target_h) {
            debug!(target_w, target_h, "resampling to display resolution");
            gray = resize_gray(gray, target_w, target_h)?;
        }
    }

    let gray = autocontrast(gray, profile.cutoff)?;
    let (width, height) = gray.dimensions();

    let encoded = encode_png(&gray)?;
    let bytes_out = encoded.len() as u64;

    let output_path = match output {
        Some(path) => path.to_path_buf(),
        None => default_output_path(input, profile.output_suffix),
    };
    write_png_atomic(&output_path, &encoded)?;
    debug!(path = %output_path.display(), bytes_out, "wrote output");

    let report = if profile.verify_output {
        Some(verify_file(&output_path)?)
    } else {
        None
    };

    Ok(OptimizeOutcome {
        output_path,
        width,
        height,
        bytes_in,
        bytes_out,
        report,
    })
}

/// Optimize an image for full-screen display: 600x800 gray PNG, contrast
/// stretched, output verified.
pub fn optimize_file(input: &Path, output: Option<&Path>) -> Result<OptimizeOutcome> {
    run_profile(input, output, &OptimizeProfile::display())
}

/// Optimize a sprite: native resolution, transparency flattened to white,
/// heavier contrast clip, no automatic verification.
pub fn optimize_sprite_file(input: &Path, output: Option<&Path>) -> Result<OptimizeOutcome> {
    run_profile(input, output, &OptimizeProfile::sprite())
}
