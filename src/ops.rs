// src/ops.rs
//
// Pipeline profiles.
// The two optimize workflows share every stage; they differ only in this
// configuration, so the differences live here and nowhere else.

use crate::engine::{TARGET_HEIGHT, TARGET_WIDTH};

/// Configuration for one optimize run.
///
/// Design principle: profiles are plain data. The orchestrator reads a
/// profile and composes the stages; no profile-specific branching elsewhere.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptimizeProfile {
    /// Autocontrast clip, percent of total pixels removed per tail
    /// (0..=100; 50 and above always degenerates to a no-op)
    pub cutoff: u32,
    /// Resample to this exact size when dimensions differ (None = keep native)
    pub resize_to: Option<(u32, u32)>,
    /// Run the compatibility checker on the written output
    pub verify_output: bool,
    /// Appended to the input base name when no output path is given
    pub output_suffix: &'static str,
}

impl OptimizeProfile {
    /// Full-screen display profile: 600x800 portrait, gentle tail clip,
    /// output is verified automatically.
    pub fn display() -> Self {
        Self {
            cutoff: 1,
            resize_to: Some((TARGET_WIDTH, TARGET_HEIGHT)),
            verify_output: true,
            output_suffix: "_eink_optimized",
        }
    }

    /// Sprite profile: native resolution preserved (sprites are composited
    /// onto a display canvas elsewhere), heavier clip because anti-aliased
    /// sprite edges produce extreme-valued outlier pixels.
    pub fn sprite() -> Self {
        Self {
            cutoff: 2,
            resize_to: None,
            verify_output: false,
            output_suffix: "_eink",
        }
    }
}
