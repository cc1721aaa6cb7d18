//! PDF Combine Library
//!
//! Combines PDF and JPEG files into one PDF per group, where the groups are
//! read from a spreadsheet. This library provides functionality to:
//! - Read an output/input file grouping from a workbook sheet
//! - Detect PDF and JPEG files from their content
//! - Convert images to single-page PDFs
//! - Merge multiple PDF files
//!
//! # Example
//!
//! ```no_run
//! use pdf_combine::combine::{combine_files, CombineOptions};
//! use pdf_combine::grouping::{read_workbook, ReadOptions};
//! use std::path::{Path, PathBuf};
//!
//! let grouping = read_workbook(
//!     Path::new("mapping.xlsx"),
//!     &ReadOptions {
//!         sheet: None,
//!         input_column: "Scan".to_string(),
//!         output_column: "Document".to_string(),
//!     },
//! )
//! .expect("Failed to read workbook");
//!
//! let report = combine_files(
//!     &grouping,
//!     &CombineOptions {
//!         input_root: Some(PathBuf::from("scans")),
//!         output_root: Some(PathBuf::from("documents")),
//!     },
//! )
//! .expect("Failed to combine files");
//!
//! println!("{} files written", report.written());
//! ```

pub mod classify;
pub mod combine;
pub mod error;
pub mod grouping;
pub mod logging;
pub mod pdf;

// Re-export commonly used items
pub use error::{Error, Result};
