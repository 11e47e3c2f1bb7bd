//! Boundary to the external text-completion backend.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("AI recommendations are disabled")]
    Disabled,
    #[error("AI recommendations are enabled but no oracle provider is configured")]
    NotConfigured,
    #[error("oracle call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("oracle transport failure: {0}")]
    Transport(String),
    #[error("oracle returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("oracle response was malformed: {0}")]
    Malformed(String),
    #[error("prompt rendering failed: {0}")]
    Prompt(String),
}

/// A single free-text completion call. Prompt construction and response
/// parsing belong to the caller, so any provider can sit behind this trait.
#[async_trait]
pub trait ExternalOracle: Send + Sync {
    /// Short provider label used in results and logs (`openai`, `ollama`, ...).
    fn provider(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, OracleError>;
}

/// Explicit oracle switch handed to the orchestrator at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OracleConfig {
    pub enabled: bool,
    pub timeout: Duration,
}

pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(10);

impl Default for OracleConfig {
    fn default() -> Self {
        Self { enabled: false, timeout: DEFAULT_ORACLE_TIMEOUT }
    }
}

impl OracleConfig {
    pub fn enabled(timeout: Duration) -> Self {
        Self { enabled: true, timeout }
    }

    pub fn disabled() -> Self {
        Self::default()
    }
}
