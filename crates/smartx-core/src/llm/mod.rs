//! Completion and embedding service backends.
//!
//! The pipeline only talks to these traits, so tests and alternative
//! providers can stand in for the OpenAI-compatible HTTP client.

mod openai;

pub use openai::OpenAiBackend;

use async_trait::async_trait;

use crate::error::LlmError;

/// Result type for backend calls.
pub type Result<T> = std::result::Result<T, LlmError>;

/// A text-completion service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send one prompt and return the raw response text.
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String>;

    /// Model identifier, for logging.
    fn model_id(&self) -> &str;
}

/// An embedding service.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts; one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
