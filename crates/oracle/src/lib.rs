//! HTTP-backed [`ExternalOracle`] implementations, one per provider.
//!
//! The orchestrator only sees the trait; this crate picks the concrete client
//! from [`OracleSettings`] once, at startup.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use autotag_core::config::{OracleProvider, OracleSettings};
use autotag_core::oracle::ExternalOracle;

mod http;
pub mod providers;

pub use providers::{AnthropicOracle, GeminiOracle, OllamaOracle, OpenAiOracle};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OracleBuildError {
    #[error("provider `{provider}` requires an api key")]
    MissingApiKey { provider: &'static str },
    #[error("http client could not be built: {0}")]
    Client(String),
}

pub fn default_model(provider: OracleProvider) -> &'static str {
    match provider {
        OracleProvider::OpenAi => "gpt-4o-mini",
        OracleProvider::Anthropic => "claude-3-5-haiku-latest",
        OracleProvider::Gemini => "gemini-1.5-flash",
        OracleProvider::Ollama => "llama3.1",
    }
}

pub fn default_base_url(provider: OracleProvider) -> &'static str {
    match provider {
        OracleProvider::OpenAi => "https://api.openai.com/v1",
        OracleProvider::Anthropic => "https://api.anthropic.com/v1",
        OracleProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        OracleProvider::Ollama => "http://localhost:11434",
    }
}

/// Builds the configured oracle, or `None` when the oracle is switched off.
pub fn build_oracle(
    settings: &OracleSettings,
) -> Result<Option<Arc<dyn ExternalOracle>>, OracleBuildError> {
    if !settings.enabled {
        return Ok(None);
    }

    let provider = settings.provider;
    let model = settings.model.clone().unwrap_or_else(|| default_model(provider).to_string());
    let base_url = settings
        .base_url
        .as_deref()
        .unwrap_or_else(|| default_base_url(provider))
        .trim_end_matches('/')
        .to_string();
    // Transport deadline sits past the orchestrator timeout.
    let client = http::client(Duration::from_secs(settings.timeout_secs.saturating_add(5)))?;

    let api_key = || {
        settings
            .api_key
            .clone()
            .ok_or(OracleBuildError::MissingApiKey { provider: provider.as_str() })
    };

    let oracle: Arc<dyn ExternalOracle> = match provider {
        OracleProvider::OpenAi => Arc::new(OpenAiOracle::new(client, base_url, model, api_key()?)),
        OracleProvider::Anthropic => {
            Arc::new(AnthropicOracle::new(client, base_url, model, api_key()?))
        }
        OracleProvider::Gemini => Arc::new(GeminiOracle::new(client, base_url, model, api_key()?)),
        OracleProvider::Ollama => Arc::new(OllamaOracle::new(client, base_url, model)),
    };

    info!(
        event_name = "oracle.configured",
        provider = provider.as_str(),
        timeout_secs = settings.timeout_secs,
        "external oracle configured"
    );
    Ok(Some(oracle))
}
