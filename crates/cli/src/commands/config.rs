use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use serde::Serialize;
use toml::Value;

use autotag_core::config::{AppConfig, LoadOptions};

use crate::commands::{CommandResult, EXIT_CONFIG_VALIDATION};

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG_VALIDATION,
            );
        }
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let entries: Vec<ConfigEntry> = effective_values(&config)
        .into_iter()
        .map(|(key, env_key, value)| ConfigEntry {
            key,
            value,
            source: field_source(
                key,
                env_key,
                override_flag(key, options),
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        })
        .collect();

    CommandResult::with_data(
        "config",
        "effective config (source precedence: flag > env > file > default)",
        &entries,
    )
}

fn effective_values(config: &AppConfig) -> Vec<(&'static str, &'static str, String)> {
    let oracle = &config.oracle;
    let model = match &oracle.model {
        Some(model) => model.clone(),
        None => format!("<default: {}>", autotag_oracle::default_model(oracle.provider)),
    };
    let api_key = oracle
        .api_key
        .as_ref()
        .map(|key| redact_token(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    vec![
        ("database.url", "AUTOTAG_DATABASE_URL", config.database.url.clone()),
        (
            "database.max_connections",
            "AUTOTAG_DATABASE_MAX_CONNECTIONS",
            config.database.max_connections.to_string(),
        ),
        (
            "database.timeout_secs",
            "AUTOTAG_DATABASE_TIMEOUT_SECS",
            config.database.timeout_secs.to_string(),
        ),
        ("oracle.enabled", "AUTOTAG_ORACLE_ENABLED", oracle.enabled.to_string()),
        ("oracle.provider", "AUTOTAG_ORACLE_PROVIDER", oracle.provider.as_str().to_string()),
        ("oracle.api_key", "AUTOTAG_ORACLE_API_KEY", api_key),
        (
            "oracle.base_url",
            "AUTOTAG_ORACLE_BASE_URL",
            oracle.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        ("oracle.model", "AUTOTAG_ORACLE_MODEL", model),
        ("oracle.timeout_secs", "AUTOTAG_ORACLE_TIMEOUT_SECS", oracle.timeout_secs.to_string()),
        (
            "recommendation.historical_limit",
            "AUTOTAG_RECOMMENDATION_HISTORICAL_LIMIT",
            config.recommendation.historical_limit.to_string(),
        ),
        (
            "recommendation.max_suggestions",
            "AUTOTAG_RECOMMENDATION_MAX_SUGGESTIONS",
            config.recommendation.max_suggestions.to_string(),
        ),
        (
            "recommendation.include_statistical",
            "AUTOTAG_RECOMMENDATION_INCLUDE_STATISTICAL",
            config.recommendation.include_statistical.to_string(),
        ),
        ("logging.level", "AUTOTAG_LOGGING_LEVEL", config.logging.level.clone()),
        ("logging.format", "AUTOTAG_LOGGING_FORMAT", format!("{:?}", config.logging.format)),
    ]
}

fn override_flag(key: &str, options: &LoadOptions) -> Option<&'static str> {
    match key {
        "database.url" if options.overrides.database_url.is_some() => Some("--database-url"),
        "logging.level" if options.overrides.log_level.is_some() => Some("--log-level"),
        _ => None,
    }
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    ["autotag.toml", "config/autotag.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    flag: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(flag) = flag {
        return format!("flag ({flag})");
    }

    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
