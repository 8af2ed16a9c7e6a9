//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod process;
pub mod schema;

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use smartx_core::models::config::SmartxConfig;
use smartx_core::{ExtractionPipeline, OpenAiBackend, VectorStore};

/// Load the config from `--config`, else the default location, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<SmartxConfig> {
    if let Some(path) = config_path {
        return Ok(SmartxConfig::from_file(Path::new(path))?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Using config from {}", default_path.display());
        Ok(SmartxConfig::from_file(&default_path)?)
    } else {
        Ok(SmartxConfig::default())
    }
}

/// Build the pipeline against the configured OpenAI-compatible API.
///
/// Fails when the API key is not available.
pub fn build_pipeline(config: &SmartxConfig, store: VectorStore) -> anyhow::Result<ExtractionPipeline> {
    let api_key = config.llm.api_key()?;
    let backend = Arc::new(OpenAiBackend::from_config(&config.llm, api_key));
    debug!("Using model {} at {}", config.llm.model, config.llm.base_url);

    Ok(ExtractionPipeline::from_config(
        config,
        store,
        backend.clone(),
        backend,
    )?)
}

/// The user interrupted the run.
#[derive(Debug, Error)]
#[error("Cancelled")]
pub struct Cancelled;

/// Run a future until it completes or Ctrl-C is pressed.
pub async fn cancellable<F, T>(future: F) -> anyhow::Result<T>
where
    F: Future<Output = smartx_core::Result<T>>,
{
    race_signal(future, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            debug!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Resolve `future`, or fail with [`Cancelled`] if `signal` fires first.
async fn race_signal<F, S, T>(future: F, signal: S) -> anyhow::Result<T>
where
    F: Future<Output = smartx_core::Result<T>>,
    S: Future<Output = ()>,
{
    tokio::select! {
        result = future => Ok(result?),
        _ = signal => Err(Cancelled.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_yields_cancelled() {
        let pending = std::future::pending::<smartx_core::Result<()>>();
        let err = race_signal(pending, async {}).await.unwrap_err();
        assert!(err.is::<Cancelled>());
        assert_eq!(err.to_string(), "Cancelled");
    }

    #[tokio::test]
    async fn test_finished_future_wins() {
        let value = race_signal(async { Ok(7) }, std::future::pending()).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_pipeline_error_is_not_cancellation() {
        let failing = async { Err::<(), _>(smartx_core::SmartxError::Config("bad".into())) };
        let err = race_signal(failing, std::future::pending()).await.unwrap_err();
        assert!(!err.is::<Cancelled>());
    }
}
