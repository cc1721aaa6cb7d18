//! PDF manipulation module

pub mod convert;
pub mod merge;
pub mod metadata;

// Re-export commonly used items
pub use convert::image_to_pdf;
pub use merge::{merge_pdfs, MergeOptions};
pub use metadata::count_pages;
