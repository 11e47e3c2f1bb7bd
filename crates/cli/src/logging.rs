use anyhow::Context;
use tracing_subscriber::EnvFilter;

use autotag_core::config::{AppConfig, LoadOptions, LogFormat};

/// Installs the stderr subscriber so stdout carries only the JSON payload.
/// An invalid config falls back to warnings only; the command itself reports
/// the config error.
pub fn init(options: &LoadOptions) {
    let (level, format) = match AppConfig::load(options.clone()) {
        Ok(config) => (config.logging.level, config.logging.format),
        Err(_) => ("warn".to_string(), LogFormat::Compact),
    };

    if let Err(error) = install(&level, format) {
        eprintln!("logging disabled: {error:#}");
    }
}

fn install(level: &str, format: LogFormat) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(level).with_context(|| format!("invalid log level `{level}`"))?;
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|error| anyhow::anyhow!("install tracing subscriber: {error}"))
}
