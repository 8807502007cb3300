// lib.rs
//
// eink-image: pixel-transform pipeline for monochrome e-ink displays
//
// Design goals:
// - One mode-tagged decode, no ad-hoc format sniffing downstream
// - Transparency always flattened onto white before grayscale
// - Deterministic, single-pass, per-image pipelines
// - Output always verifiable: 600x800, 8-bit gray, PNG, no alpha

pub mod engine;
pub mod error;
pub mod ops;

use error::EinkImageError;
use image::ImageReader;
use std::io::{BufRead, BufReader, Cursor, Seek};

/// Image metadata readable from the header without decoding pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectMetadata {
    pub width: u32,
    pub height: u32,
    pub format: Option<String>,
}

fn read_inspect_metadata<R: BufRead + Seek>(
    reader: R,
) -> std::result::Result<InspectMetadata, EinkImageError> {
    let reader = ImageReader::new(reader)
        .with_guessed_format()
        .map_err(|e| EinkImageError::decode_failed(format!("failed to read image header: {e}")))?;

    let format = reader.format().map(|f| format!("{:?}", f).to_lowercase());
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| EinkImageError::decode_failed(format!("failed to read dimensions: {e}")))?;

    Ok(InspectMetadata {
        width,
        height,
        format,
    })
}

/// Inspect image metadata WITHOUT decoding pixels.
/// Reads only the header bytes - useful for logging input properties or
/// rejecting oversized files before spending CPU on a decode.
pub fn inspect_header_from_bytes(
    data: &[u8],
) -> std::result::Result<InspectMetadata, EinkImageError> {
    read_inspect_metadata(Cursor::new(data))
}

/// Inspect image metadata from a file path without loading the whole file.
pub fn inspect_header_from_path(
    path: &str,
) -> std::result::Result<InspectMetadata, EinkImageError> {
    use std::fs::File;

    let file =
        File::open(path).map_err(|e| EinkImageError::file_read_failed(path.to_string(), e))?;
    read_inspect_metadata(BufReader::new(file))
}
