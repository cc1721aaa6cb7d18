//! File type detection from magic bytes

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

const PDF_MAGIC: &[u8] = b"%PDF";
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Number of leading bytes inspected
const SIGNATURE_LEN: usize = 4;

/// Content type of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Jpeg,
    Unknown,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Pdf => write!(f, "PDF"),
            FileKind::Jpeg => write!(f, "JPEG"),
            FileKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Classify a file by its first bytes. The file name is never consulted.
///
/// Files shorter than four bytes are `Unknown`.
pub fn classify_file(path: &Path) -> Result<FileKind> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let mut header = Vec::with_capacity(SIGNATURE_LEN);
    File::open(path)?
        .take(SIGNATURE_LEN as u64)
        .read_to_end(&mut header)?;

    Ok(classify_bytes(&header))
}

/// Classify an in-memory file header
pub fn classify_bytes(header: &[u8]) -> FileKind {
    if header.len() < SIGNATURE_LEN {
        FileKind::Unknown
    } else if header.starts_with(PDF_MAGIC) {
        FileKind::Pdf
    } else if header.starts_with(JPEG_MAGIC) {
        FileKind::Jpeg
    } else {
        FileKind::Unknown
    }
}
