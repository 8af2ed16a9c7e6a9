//! OpenAI-compatible HTTP backend for chat completions and embeddings.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{CompletionBackend, Embedder, Result};
use crate::error::LlmError;
use crate::models::config::LlmConfig;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Client for any endpoint speaking the OpenAI REST dialect.
pub struct OpenAiBackend {
    base_url: String,
    model: String,
    embedding_model: String,
    api_key: SecretString,
    client: Client,
}

impl OpenAiBackend {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            embedding_model: "text-embedding-ada-002".to_string(),
            api_key,
            client: Client::new(),
        }
    }

    /// Build a backend from the `llm` config section.
    pub fn from_config(config: &LlmConfig, api_key: SecretString) -> Self {
        Self::new(api_key, config.model.clone())
            .with_base_url(config.base_url.clone())
            .with_embedding_model(config.embedding_model.clone())
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        Ok(response)
    }
}

/// Pull the human-readable message out of an OpenAI error body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json["error"]["message"]
                .as_str()
                .or_else(|| json["message"].as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "Sending completion request");
        let response: ChatResponse = self.post("chat/completions", &request).await?.json().await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse)?;

        trace!(response_chars = content.len(), "Completion received");
        Ok(content)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for OpenAiBackend {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };

        debug!(model = %self.embedding_model, n = texts.len(), "Requesting embeddings");
        let response: EmbeddingResponse = self.post("embeddings", &request).await?.json().await?;

        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message_from_openai_body() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(api_error_message(body), "Incorrect API key provided");
    }

    #[test]
    fn test_api_error_message_falls_back_to_raw_body() {
        assert_eq!(api_error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let backend = OpenAiBackend::new(SecretString::from("k".to_string()), "gpt-3.5-turbo")
            .with_base_url("http://localhost:11434/v1/");
        assert_eq!(backend.url("embeddings"), "http://localhost:11434/v1/embeddings");
    }

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            model: "gpt-3.5-turbo",
            messages: vec![ChatMessage { role: "user", content: "hi" }],
            temperature: 0.0,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["temperature"], 0.0);
    }

    #[test]
    fn test_chat_response_with_null_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(response.choices[0].message.content.is_none());
    }
}
