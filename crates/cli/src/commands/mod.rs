pub mod config;
pub mod explain;
pub mod migrate;
pub mod record;
pub mod recommend;
pub mod rules;
pub mod seed;
pub mod suggest;

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use autotag_core::config::{AppConfig, LoadOptions};
use autotag_core::errors::ApplicationError;
use autotag_core::{Recommender, RecommenderPorts, RuleService};
use autotag_db::{
    connect_with_config, migrations, DbPool, SqlAnalyticsRepository, SqlPartnerRepository,
    SqlProductRepository, SqlRuleRepository, SqlTransactionHistoryRepository,
};

pub const EXIT_CONFIG_VALIDATION: u8 = 2;
pub const EXIT_RUNTIME_INIT: u8 = 3;
pub const EXIT_DB_CONNECTIVITY: u8 = 4;
pub const EXIT_MIGRATION: u8 = 5;
pub const EXIT_SEED_VERIFICATION: u8 = 6;
pub const EXIT_INVALID_INPUT: u8 = 7;
pub const EXIT_PERSISTENCE: u8 = 8;
pub const EXIT_ORACLE_INIT: u8 = 9;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: None,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    /// Success carrying a structured body under `data`.
    pub fn with_data(command: &str, message: impl Into<String>, data: &impl Serialize) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(error) => {
                return Self::failure(command, "serialization", error.to_string(), 1);
            }
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: Some(data),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\
             \"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// A classified command failure: error class, message, exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub class: &'static str,
    pub message: String,
    pub exit_code: u8,
}

impl Failure {
    pub fn new(class: &'static str, message: impl Into<String>, exit_code: u8) -> Self {
        Self { class, message: message.into(), exit_code }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new("invalid_input", message, EXIT_INVALID_INPUT)
    }

    fn into_result(self, command: &str) -> CommandResult {
        CommandResult::failure(command, self.class, self.message, self.exit_code)
    }
}

impl From<ApplicationError> for Failure {
    fn from(error: ApplicationError) -> Self {
        match &error {
            ApplicationError::Domain(_) => Self::invalid_input(error.to_string()),
            ApplicationError::Persistence(_) => {
                Self::new("persistence", error.to_string(), EXIT_PERSISTENCE)
            }
            ApplicationError::Integration(_) => {
                Self::new("integration", error.to_string(), EXIT_PERSISTENCE)
            }
            ApplicationError::Configuration(_) => {
                Self::new("config_validation", error.to_string(), EXIT_CONFIG_VALIDATION)
            }
        }
    }
}

/// Loads configuration, starts a current-thread runtime and drives `body`.
/// Config and runtime failures become classified results before `body` runs.
pub fn execute<F, Fut>(command: &str, options: &LoadOptions, body: F) -> CommandResult
where
    F: FnOnce(AppConfig) -> Fut,
    Fut: Future<Output = Result<CommandResult, Failure>>,
{
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                EXIT_CONFIG_VALIDATION,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME_INIT,
            );
        }
    };

    runtime.block_on(body(config)).unwrap_or_else(|failure| failure.into_result(command))
}

/// Connects and brings the schema up to date.
pub async fn open_database(config: &AppConfig) -> Result<DbPool, Failure> {
    let pool = connect_with_config(&config.database).await.map_err(|error| {
        Failure::new("db_connectivity", error.to_string(), EXIT_DB_CONNECTIVITY)
    })?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| Failure::new("migration", error.to_string(), EXIT_MIGRATION))?;
    Ok(pool)
}

/// SQL-backed services shared by the data commands.
pub struct Services {
    pub pool: DbPool,
    pub recommender: Recommender,
    pub rules: RuleService,
    pub history: Arc<SqlTransactionHistoryRepository>,
}

impl Services {
    pub async fn open(config: &AppConfig) -> Result<Self, Failure> {
        let pool = open_database(config).await?;

        let rules = Arc::new(SqlRuleRepository::new(pool.clone()));
        let catalog = Arc::new(SqlAnalyticsRepository::new(pool.clone()));
        let history = Arc::new(SqlTransactionHistoryRepository::new(pool.clone()));
        let ports = RecommenderPorts {
            partners: Arc::new(SqlPartnerRepository::new(pool.clone())),
            products: Arc::new(SqlProductRepository::new(pool.clone())),
            rules: rules.clone(),
            history: history.clone(),
            catalog: catalog.clone(),
        };

        let mut recommender = Recommender::new(ports, config.oracle_config())
            .with_history_options(config.history_options());
        let oracle = autotag_oracle::build_oracle(&config.oracle)
            .map_err(|error| Failure::new("oracle_init", error.to_string(), EXIT_ORACLE_INIT))?;
        if let Some(oracle) = oracle {
            recommender = recommender.with_oracle(oracle);
        }

        Ok(Self { pool, recommender, rules: RuleService::new(rules, catalog), history })
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
