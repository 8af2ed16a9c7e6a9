//! Core library for extracting transport and packaging data from invoice PDFs.
//!
//! This crate provides:
//! - PDF page text extraction
//! - A request-scoped semantic page index over an embedding service
//! - Prompting a completion service and strict parsing of its JSON answer
//! - Form-schema templates and the merge of extracted values into them

pub mod error;
pub mod extract;
pub mod index;
pub mod llm;
pub mod models;
pub mod pdf;
pub mod pipeline;
pub mod schema;

pub use error::{Result, SmartxError};
pub use extract::{ExtractionResult, FieldExtractor, ResponseParser, Stage, parse_response};
pub use index::{PageIndexer, QueryStrategy, SelectedPage, VectorStore};
pub use llm::{CompletionBackend, Embedder, OpenAiBackend};
pub use models::config::SmartxConfig;
pub use pdf::{PdfContent, PdfExtractor, PdfProcessor, PdfType};
pub use pipeline::{ExtractionPipeline, PipelineOutput};
pub use schema::{MergeReport, SchemaTemplate, merge, transport_template};
