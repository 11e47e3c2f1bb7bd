use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::oracle::OracleConfig;
use crate::recommend::HistoryOptions;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub oracle: OracleSettings,
    pub recommendation: RecommendationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct OracleSettings {
    pub enabled: bool,
    pub provider: OracleProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    /// Provider default when unset.
    pub model: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct RecommendationConfig {
    pub historical_limit: usize,
    pub max_suggestions: usize,
    pub include_statistical: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Gemini,
    Ollama,
}

impl OracleProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }

    pub fn is_hosted(&self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub oracle_enabled: Option<bool>,
    pub oracle_provider: Option<OracleProvider>,
    pub oracle_model: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://autotag.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            oracle: OracleSettings {
                enabled: false,
                provider: OracleProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: None,
                timeout_secs: 10,
            },
            recommendation: RecommendationConfig {
                historical_limit: 20,
                max_suggestions: 3,
                include_statistical: true,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for OracleProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported oracle provider `{other}` (expected openai|anthropic|gemini|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("autotag.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// The explicit oracle switch handed to the orchestrator.
    pub fn oracle_config(&self) -> OracleConfig {
        OracleConfig {
            enabled: self.oracle.enabled,
            timeout: Duration::from_secs(self.oracle.timeout_secs),
        }
    }

    pub fn history_options(&self) -> HistoryOptions {
        HistoryOptions {
            historical_limit: self.recommendation.historical_limit,
            include_statistical: self.recommendation.include_statistical,
            max_results: self.recommendation.max_suggestions,
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(oracle) = patch.oracle {
            if let Some(enabled) = oracle.enabled {
                self.oracle.enabled = enabled;
            }
            if let Some(provider) = oracle.provider {
                self.oracle.provider = provider;
            }
            if let Some(api_key) = oracle.api_key {
                self.oracle.api_key = Some(api_key.into());
            }
            if let Some(base_url) = oracle.base_url {
                self.oracle.base_url = Some(base_url);
            }
            if let Some(model) = oracle.model {
                self.oracle.model = Some(model);
            }
            if let Some(timeout_secs) = oracle.timeout_secs {
                self.oracle.timeout_secs = timeout_secs;
            }
        }

        if let Some(recommendation) = patch.recommendation {
            if let Some(historical_limit) = recommendation.historical_limit {
                self.recommendation.historical_limit = historical_limit;
            }
            if let Some(max_suggestions) = recommendation.max_suggestions {
                self.recommendation.max_suggestions = max_suggestions;
            }
            if let Some(include_statistical) = recommendation.include_statistical {
                self.recommendation.include_statistical = include_statistical;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("AUTOTAG_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("AUTOTAG_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_env("AUTOTAG_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("AUTOTAG_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("AUTOTAG_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("AUTOTAG_ORACLE_ENABLED") {
            self.oracle.enabled = parse_env("AUTOTAG_ORACLE_ENABLED", &value)?;
        }
        if let Some(value) = read_env("AUTOTAG_ORACLE_PROVIDER") {
            self.oracle.provider = value.parse()?;
        }
        if let Some(value) = read_env("AUTOTAG_ORACLE_API_KEY") {
            self.oracle.api_key = Some(value.into());
        }
        if let Some(value) = read_env("AUTOTAG_ORACLE_BASE_URL") {
            self.oracle.base_url = Some(value);
        }
        if let Some(value) = read_env("AUTOTAG_ORACLE_MODEL") {
            self.oracle.model = Some(value);
        }
        if let Some(value) = read_env("AUTOTAG_ORACLE_TIMEOUT_SECS") {
            self.oracle.timeout_secs = parse_env("AUTOTAG_ORACLE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("AUTOTAG_RECOMMENDATION_HISTORICAL_LIMIT") {
            self.recommendation.historical_limit =
                parse_env("AUTOTAG_RECOMMENDATION_HISTORICAL_LIMIT", &value)?;
        }
        if let Some(value) = read_env("AUTOTAG_RECOMMENDATION_MAX_SUGGESTIONS") {
            self.recommendation.max_suggestions =
                parse_env("AUTOTAG_RECOMMENDATION_MAX_SUGGESTIONS", &value)?;
        }
        if let Some(value) = read_env("AUTOTAG_RECOMMENDATION_INCLUDE_STATISTICAL") {
            self.recommendation.include_statistical =
                parse_env("AUTOTAG_RECOMMENDATION_INCLUDE_STATISTICAL", &value)?;
        }

        let log_level =
            read_env("AUTOTAG_LOGGING_LEVEL").or_else(|| read_env("AUTOTAG_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("AUTOTAG_LOGGING_FORMAT").or_else(|| read_env("AUTOTAG_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(enabled) = overrides.oracle_enabled {
            self.oracle.enabled = enabled;
        }
        if let Some(provider) = overrides.oracle_provider {
            self.oracle.provider = provider;
        }
        if let Some(model) = overrides.oracle_model {
            self.oracle.model = Some(model);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_oracle(&self.oracle)?;
        validate_recommendation(&self.recommendation)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("autotag.toml"), PathBuf::from("config/autotag.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Expands `${VAR}` references; an unset variable is an error.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || !matches!(chars.peek(), Some('{')) {
            output.push(ch);
            continue;
        }
        chars.next();

        let mut key = String::new();
        loop {
            match chars.next() {
                Some('}') => break,
                Some(next) => key.push(next),
                None => return Err(ConfigError::UnterminatedInterpolation),
            }
        }

        let value =
            env::var(&key).map_err(|_| ConfigError::MissingEnvInterpolation { var: key })?;
        output.push_str(&value);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_oracle(oracle: &OracleSettings) -> Result<(), ConfigError> {
    if oracle.timeout_secs == 0 || oracle.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "oracle.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    if let Some(base_url) = &oracle.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "oracle.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    // credentials only matter once the oracle is switched on
    if !oracle.enabled {
        return Ok(());
    }

    if oracle.provider.is_hosted() {
        let missing = oracle
            .api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(format!(
                "oracle.api_key is required when oracle.enabled is true and provider is `{}`",
                oracle.provider.as_str()
            )));
        }
    } else {
        let missing =
            oracle.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "oracle.base_url is required for the ollama provider".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_recommendation(recommendation: &RecommendationConfig) -> Result<(), ConfigError> {
    if !(1..=500).contains(&recommendation.historical_limit) {
        return Err(ConfigError::Validation(
            "recommendation.historical_limit must be in range 1..=500".to_string(),
        ));
    }

    if !(1..=10).contains(&recommendation.max_suggestions) {
        return Err(ConfigError::Validation(
            "recommendation.max_suggestions must be in range 1..=10".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    oracle: Option<OraclePatch>,
    recommendation: Option<RecommendationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct OraclePatch {
    enabled: Option<bool>,
    provider: Option<OracleProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationPatch {
    historical_limit: Option<usize>,
    max_suggestions: Option<usize>,
    include_statistical: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
