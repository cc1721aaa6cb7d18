//! Error types for the PDF combine library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the PDF combine library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Spreadsheet could not be opened or parsed
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// Requested sheet is not part of the workbook
    #[error("Sheet {sheet} does not exist in {}", .workbook.display())]
    SheetNotFound { sheet: String, workbook: PathBuf },

    /// Configured column is not in the header row
    #[error("Column {0:?} not found in header row")]
    MissingColumn(String),

    /// Workbook has no sheets to fall back on
    #[error("{} contains no sheets", .0.display())]
    NoSheets(PathBuf),

    /// Sheet has no header row
    #[error("Sheet {0} is empty")]
    EmptySheet(String),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Image could not be decoded or re-encoded
    #[error("Cannot convert {} to PDF: {source}", .path.display())]
    Conversion {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Source PDF could not be loaded for merging
    #[error("Cannot merge {}: {source}", .path.display())]
    Merge {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// Merge called without sources
    #[error("No input files provided")]
    NoInputs,

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Whether this error stems from the run configuration (sheet, columns, workbook)
    /// rather than from an individual file.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Spreadsheet(_)
                | Error::SheetNotFound { .. }
                | Error::MissingColumn(_)
                | Error::EmptySheet(_)
                | Error::NoSheets(_)
        )
    }
}
