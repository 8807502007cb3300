// src/engine/contrast.rs
//
// Contrast Stretcher: percentile-clipped autocontrast.
//
// E-ink panels have maybe 16 usable gray levels on a reflective surface;
// content that does not span the full [0,255] range renders muddy. The
// stretch discards outlier tails and remaps the rest to the full range.

use crate::error::{EinkImageError, Result};
use image::GrayImage;

/// Remap intensities to fill [0,255], clipping `cutoff` percent of the
/// total pixel count from each tail of the histogram.
///
/// A degenerate image (uniform intensity, or a cutoff aggressive enough to
/// empty the histogram) is returned unchanged rather than divided by zero.
///
/// `cutoff` is a per-tail percentage in 0..=100. At 50 and above both tail
/// scans always meet, so the input comes back unchanged through the
/// degenerate path rather than as an error.
pub fn autocontrast(mut gray: GrayImage, cutoff: u32) -> Result<GrayImage> {
    if cutoff > 100 {
        return Err(EinkImageError::invalid_argument(
            "cutoff",
            cutoff.to_string(),
            "clip percentage cannot exceed 100",
        ));
    }

    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }
    let total: u64 = histogram.iter().sum();
    let clip = total * cutoff as u64 / 100;

    // Drop whole bins from the low end while the running count stays within
    // the clip budget; the first surviving bin is `lo`. Symmetric for `hi`.
    let mut lo = 0usize;
    let mut removed = 0u64;
    while lo < 256 && removed + histogram[lo] <= clip {
        removed += histogram[lo];
        lo += 1;
    }

    let mut hi = 255usize;
    let mut removed = 0u64;
    while hi > 0 && removed + histogram[hi] <= clip {
        removed += histogram[hi];
        hi -= 1;
    }

    if lo >= hi {
        // Degenerate: nothing to stretch
        return Ok(gray);
    }

    let span = (hi - lo) as u32;
    let mut lut = [0u8; 256];
    for (v, entry) in lut.iter_mut().enumerate() {
        *entry = if v <= lo {
            0
        } else if v >= hi {
            255
        } else {
            // round((v - lo) * 255 / (hi - lo))
            (((v - lo) as u32 * 255 + span / 2) / span) as u8
        };
    }

    for pixel in gray.pixels_mut() {
        pixel.0[0] = lut[pixel.0[0] as usize];
    }
    Ok(gray)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn gray_from(values: &[u8], width: u32, height: u32) -> GrayImage {
        GrayImage::from_raw(width, height, values.to_vec()).unwrap()
    }

    #[test]
    fn test_constant_image_unchanged() {
        let img = GrayImage::from_pixel(4, 4, Luma([128]));
        let out = autocontrast(img.clone(), 1).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn test_stretch_fills_full_range() {
        let img = gray_from(&[60, 100, 140, 180], 4, 1);
        let out = autocontrast(img, 0).unwrap();
        let values: Vec<u8> = out.pixels().map(|p| p.0[0]).collect();
        assert_eq!(*values.iter().min().unwrap(), 0);
        assert_eq!(*values.iter().max().unwrap(), 255);
    }

    #[test]
    fn test_stretch_exact_remap() {
        // lo=50, hi=250, span=200: 150 -> round(100*255/200) = 128
        let img = gray_from(&[50, 150, 250], 3, 1);
        let out = autocontrast(img, 0).unwrap();
        let values: Vec<u8> = out.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![0, 128, 255]);
    }

    #[test]
    fn test_cutoff_clips_outlier_tails() {
        // 100 pixels: one 0, one 255, the rest in [100, 150].
        // cutoff=1 clips one pixel per tail, so the outliers are discarded
        // and 100/150 become the new extremes.
        let mut values = vec![0u8];
        values.extend(std::iter::repeat(100u8).take(49));
        values.extend(std::iter::repeat(150u8).take(49));
        values.push(255);
        let img = gray_from(&values, 100, 1);
        let out = autocontrast(img, 1).unwrap();
        let out_values: Vec<u8> = out.pixels().map(|p| p.0[0]).collect();
        // Clipped extremes clamp to the new range ends
        assert_eq!(out_values[0], 0);
        assert_eq!(out_values[99], 255);
        assert_eq!(out_values[1], 0);
        assert_eq!(out_values[50], 255);
    }

    #[test]
    fn test_monotonicity_preserved() {
        let values: Vec<u8> = (0..=255).map(|v| v as u8).collect();
        let img = gray_from(&values, 256, 1);
        let out = autocontrast(img, 2).unwrap();
        let out_values: Vec<u8> = out.pixels().map(|p| p.0[0]).collect();
        for pair in out_values.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn test_aggressive_cutoff_degenerates_unchanged() {
        // Past 50 per tail the scans always meet; the image passes through
        let img = gray_from(&[0, 100, 200, 255], 4, 1);
        for cutoff in [50, 60, 100] {
            let out = autocontrast(img.clone(), cutoff).unwrap();
            assert_eq!(out, img);
        }
    }

    #[test]
    fn test_cutoff_over_100_rejected() {
        let img = GrayImage::from_pixel(2, 2, Luma([10]));
        let err = autocontrast(img, 101).unwrap_err();
        assert!(matches!(err, EinkImageError::InvalidArgument { .. }));
    }

    #[test]
    fn test_empty_image_unchanged() {
        let img = GrayImage::new(0, 0);
        let out = autocontrast(img, 1).unwrap();
        assert_eq!(out.dimensions(), (0, 0));
    }
}
