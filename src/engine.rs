// src/engine.rs
//
// The core of eink-image. A fixed pipeline that:
// 1. Decodes into a mode-tagged buffer (palette/tRNS resolved once)
// 2. Flattens transparency and converts to 8-bit grayscale
// 3. Optionally resamples to the display resolution
// 4. Stretches contrast and encodes a lossless PNG
//
// This file is a facade that delegates to the decomposed modules in engine/

// =============================================================================
// DISPLAY TARGET
// =============================================================================

/// Native portrait resolution of the target e-ink panel.
pub const TARGET_WIDTH: u32 = 600;
pub const TARGET_HEIGHT: u32 = 800;

/// Background color sprites and transparent regions are flattened onto.
/// E-ink paper is white; anything else ghosts badly on refresh.
pub const BACKGROUND_WHITE: [u8; 3] = [255, 255, 255];

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height).
/// Images larger than 32768x32768 are rejected to prevent decompression bombs.
/// This is the same limit used by libvips/sharp.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height).
/// 100 megapixels = 400MB uncompressed RGBA. Beyond this is likely malicious.
pub const MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod contrast;
mod decoder;
mod encoder;
mod normalize;
mod pipeline;
mod resize;
mod verify;

// Re-export commonly used types and functions
pub use contrast::autocontrast;
pub use decoder::{check_dimensions, decode_image, detect_format, ColorMode, DecodedImage};
pub use encoder::{encode_png, write_png_atomic};
pub use normalize::flatten_to_gray;
pub use pipeline::{
    default_output_path, optimize_file, optimize_sprite_file, run_profile, OptimizeOutcome,
};
pub use resize::resize_gray;
pub use verify::{verify_bytes, verify_file, CompatibilityReport};
