//! Configuration structures for the extraction pipeline.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::SmartxError;
use crate::index::QueryStrategy;

/// Main configuration for the smartx pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SmartxConfig {
    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Page retrieval configuration.
    pub retrieval: RetrievalConfig,

    /// Completion and embedding service configuration.
    pub llm: LlmConfig,

    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Schema template configuration.
    pub schema: SchemaConfig,
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Minimum text length to consider PDF as text-based.
    pub min_text_length: usize,

    /// Maximum pages to index (0 = unlimited).
    pub max_pages: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            min_text_length: 50,
            max_pages: 0,
        }
    }
}

/// Page retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Topic phrases queried against the page index.
    pub topics: Vec<String>,

    /// How per-topic hits are combined into one page.
    pub strategy: QueryStrategy,

    /// Nearest results requested per topic.
    pub results_per_query: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            topics: vec![
                "Carbon emission terms".to_string(),
                "Supply chain terms".to_string(),
                "Emission factor terms".to_string(),
            ],
            strategy: QueryStrategy::FirstTopic,
            results_per_query: 1,
        }
    }
}

/// Completion and embedding service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,

    /// Chat completion model.
    pub model: String,

    /// Embedding model used by the page index.
    pub embedding_model: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Deadline for a single completion call.
    pub completion_timeout_secs: u64,

    /// Deadline for building and querying the page index.
    pub index_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            completion_timeout_secs: 60,
            index_timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable.
    ///
    /// A missing or blank key is a startup error.
    pub fn api_key(&self) -> Result<SecretString, SmartxError> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(SecretString::from(key)),
            _ => Err(SmartxError::Config(format!(
                "{} is not set; export it or add it to .env",
                self.api_key_env
            ))),
        }
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_secs)
    }

    pub fn index_timeout(&self) -> Duration {
        Duration::from_secs(self.index_timeout_secs)
    }
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Reject known fields whose value has the wrong JSON type.
    pub strict_types: bool,

    /// Page text longer than this many characters is truncated in the prompt.
    pub max_page_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            strict_types: true,
            max_page_chars: 12_000,
        }
    }
}

/// Schema template configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Template JSON file replacing the built-in transport template.
    pub template_path: Option<PathBuf>,
}

impl SmartxConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SmartxConfig::default();
        assert_eq!(config.retrieval.topics.len(), 3);
        assert_eq!(config.retrieval.topics[0], "Carbon emission terms");
        assert_eq!(config.retrieval.results_per_query, 1);
        assert_eq!(config.retrieval.strategy, QueryStrategy::FirstTopic);
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.llm.embedding_model, "text-embedding-ada-002");
        assert!(config.extraction.strict_types);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let json = r#"{ "retrieval": { "strategy": "consensus" }, "llm": { "model": "gpt-4o-mini" } }"#;
        let config: SmartxConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.retrieval.strategy, QueryStrategy::Consensus);
        assert_eq!(config.retrieval.topics.len(), 3);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = SmartxConfig::default();
        config.pdf.max_pages = 5;
        config.save(&path).unwrap();

        let loaded = SmartxConfig::from_file(&path).unwrap();
        assert_eq!(loaded.pdf.max_pages, 5);
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let config = LlmConfig {
            api_key_env: "SMARTX_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmConfig::default()
        };
        let err = config.api_key().unwrap_err();
        assert!(matches!(err, SmartxError::Config(_)));
    }
}
