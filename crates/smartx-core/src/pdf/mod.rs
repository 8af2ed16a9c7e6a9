//! PDF processing module.

mod extractor;

pub use extractor::{PdfExtractor, PdfContent, PdfPage};

use crate::error::PdfError;

/// Type of PDF content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfType {
    /// Contains extractable text.
    Text,
    /// Contains some text, but less than the configured minimum.
    Sparse,
    /// No extractable text (scanned or unreadable).
    Empty,
}

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for PDF processing implementations.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Get the number of pages in the PDF.
    fn page_count(&self) -> u32;

    /// Extract one text blob per page, in page order.
    ///
    /// Pages whose text cannot be read yield an empty string.
    fn extract_pages(&self) -> Result<Vec<String>>;

    /// Per-page text from a second extractor, for documents the primary
    /// one reads as blank.
    fn extract_pages_fallback(&self) -> Result<Vec<String>>;
}
