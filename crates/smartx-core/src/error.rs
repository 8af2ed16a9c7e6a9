//! Error types for the smartx-core library.

use std::time::Duration;

use thiserror::Error;

/// Main error type for the smartx library.
#[derive(Error, Debug)]
pub enum SmartxError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Page index error.
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Completion or embedding service error.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// The completion response could not be turned into an extraction result.
    #[error("failed to parse the response as JSON: {0}")]
    Parse(#[from] ParseError),

    /// Schema template error.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// No page of the document matched the retrieval topics.
    #[error("no relevant page found in document")]
    NoRelevantPage,

    /// A network-bound stage exceeded its deadline.
    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: &'static str, after: Duration },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors related to the page index.
#[derive(Error, Debug)]
pub enum IndexError {
    /// A collection with this name is already registered.
    #[error("collection already exists: {0}")]
    CollectionExists(String),

    /// The collection was removed from the store.
    #[error("collection not found: {0}")]
    CollectionMissing(String),

    /// Document ids and texts differ in length.
    #[error("{ids} ids given for {texts} documents")]
    LengthMismatch { ids: usize, texts: usize },

    /// The embedding backend returned a different number of vectors.
    #[error("expected {expected} embeddings, got {actual}")]
    EmbeddingCount { expected: usize, actual: usize },

    /// The embedding backend failed.
    #[error("embedding failed: {0}")]
    Embedding(#[from] LlmError),

    /// The store lock was poisoned by a panicking holder.
    #[error("vector store lock poisoned")]
    Poisoned,
}

/// Errors from the completion and embedding services.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },

    #[error("empty response from completion service")]
    EmptyResponse,

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors related to response parsing.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The response is not valid JSON.
    #[error("malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The response is valid JSON but not an object.
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    /// A known field carries a value of the wrong kind.
    #[error("field {field:?} should be {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Errors related to schema templates.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Failed to deserialize a template.
    #[error("invalid template JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A field has no data slot entry to write into.
    #[error("field {0:?} has an empty data slot")]
    EmptyDataSlot(String),

    /// Two fields share a display name.
    #[error("duplicate display name: {0:?}")]
    DuplicateDisplayName(String),
}

/// Result type for the smartx library.
pub type Result<T> = std::result::Result<T, SmartxError>;
