//! Completion round-trip for one page.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::PromptBuilder;
use crate::error::{Result, SmartxError};
use crate::llm::CompletionBackend;

/// Sampling temperature for extraction; zero keeps answers deterministic.
pub const TEMPERATURE: f32 = 0.0;

/// Sends the extraction prompt for a page and returns the raw answer.
pub struct FieldExtractor {
    backend: Arc<dyn CompletionBackend>,
    prompt: PromptBuilder,
    timeout: Duration,
}

impl FieldExtractor {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            prompt: PromptBuilder::new(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_prompt(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = prompt;
        self
    }

    /// Deadline for the completion call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The prompt that would be sent for this page.
    pub fn prompt_for(&self, page: &str) -> String {
        self.prompt.build(page)
    }

    /// Run one completion for the page; the response text is returned as is.
    pub async fn extract(&self, page: &str) -> Result<String> {
        let prompt = self.prompt_for(page);
        debug!(model = self.backend.model_id(), prompt_chars = prompt.len(), "Requesting extraction");

        let response = tokio::time::timeout(self.timeout, self.backend.complete(&prompt, TEMPERATURE))
            .await
            .map_err(|_| SmartxError::Timeout {
                stage: "completion",
                after: self.timeout,
            })??;

        info!(response_chars = response.len(), "Extraction response received");
        Ok(response)
    }
}
