//! PDF text extraction using lopdf and pdf-extract.

use lopdf::Document;
use tracing::{debug, trace, warn};

use super::{PdfProcessor, PdfType, Result};
use crate::error::PdfError;

/// PDF content extractor using lopdf.
pub struct PdfExtractor {
    document: Option<Document>,
    raw_data: Vec<u8>,
}

/// Extracted content from a PDF.
#[derive(Debug, Clone)]
pub struct PdfContent {
    /// Type of PDF content.
    pub pdf_type: PdfType,
    /// Pages with their content.
    pub pages: Vec<PdfPage>,
}

impl PdfContent {
    /// Page texts in page order, as handed to the page index.
    pub fn page_texts(&self) -> Vec<String> {
        self.pages.iter().map(|p| p.text.clone()).collect()
    }
}

/// Content from a single PDF page.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// Page number (1-indexed).
    pub number: u32,
    /// Extracted text from this page.
    pub text: String,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
        }
    }

    /// Extract all page content from the loaded PDF.
    ///
    /// Falls back to pdf-extract when lopdf reads no text on any page.
    pub fn extract_all(&self, min_text_length: usize) -> Result<PdfContent> {
        let texts = prefer_readable(self.extract_pages()?, || self.extract_pages_fallback());
        let pdf_type = classify(&texts, min_text_length);

        let pages = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| PdfPage {
                number: i as u32 + 1,
                text,
            })
            .collect();

        Ok(PdfContent { pdf_type, pages })
    }

    fn document(&self) -> Result<&Document> {
        self.document
            .as_ref()
            .ok_or(PdfError::Parse("No document loaded".to_string()))
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify a document by the amount of text found across its pages.
fn classify(pages: &[String], min_text_length: usize) -> PdfType {
    let total: usize = pages
        .iter()
        .map(|p| p.chars().filter(|c| !c.is_whitespace()).count())
        .sum();

    let pdf_type = if total == 0 {
        PdfType::Empty
    } else if total < min_text_length {
        PdfType::Sparse
    } else {
        PdfType::Text
    };

    debug!("PDF analysis: {} pages, {} chars text -> {:?}", pages.len(), total, pdf_type);
    pdf_type
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // pdf-extract cannot decrypt, so it gets the re-serialized plain copy.
        self.raw_data = if doc.is_encrypted() {
            doc.decrypt("").map_err(|_| PdfError::Encrypted)?;
            debug!("Decrypted PDF with empty password");

            let mut plain = Vec::new();
            doc.save_to(&mut plain)
                .map_err(|e| PdfError::Parse(format!("cannot re-encode decrypted PDF: {}", e)))?;
            plain
        } else {
            data.to_vec()
        };

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_pages(&self) -> Result<Vec<String>> {
        let doc = self.document()?;

        let pages: Vec<String> = doc
            .get_pages()
            .keys()
            .map(|&number| match doc.extract_text(&[number]) {
                Ok(text) => text,
                Err(e) => {
                    trace!("Page {} has no readable text: {}", number, e);
                    String::new()
                }
            })
            .collect();

        debug!("Extracted text from {} pages", pages.len());
        Ok(pages)
    }

    fn extract_pages_fallback(&self) -> Result<Vec<String>> {
        self.document()?;
        pdf_extract::extract_text_from_mem_by_pages(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }
}

/// Keep `primary` unless every page is blank, in which case the fallback
/// pages are used when they carry any text.
fn prefer_readable(
    primary: Vec<String>,
    fallback: impl FnOnce() -> Result<Vec<String>>,
) -> Vec<String> {
    if has_text(&primary) {
        return primary;
    }

    match fallback() {
        Ok(pages) if has_text(&pages) => {
            debug!("lopdf found no text; using pdf-extract pages");
            pages
        }
        Ok(_) => primary,
        Err(e) => {
            warn!("Fallback text extraction failed: {}", e);
            primary
        }
    }
}

fn has_text(pages: &[String]) -> bool {
    pages.iter().any(|p| !p.trim().is_empty())
}
