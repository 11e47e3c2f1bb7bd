pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use autotag_core::config::{ConfigOverrides, LoadOptions};
use commands::rules::RulesCommand;

#[derive(Debug, Parser)]
#[command(
    name = "autotag",
    about = "Autotag operator CLI",
    long_about = "Recommend cost centers for purchase lines, manage assignment rules, \
                  and inspect the configuration and database that back them.",
    after_help = "Examples:\n  autotag migrate\n  autotag seed\n  \
                  autotag recommend --product prod-oak-desk --partner partner-azure\n  \
                  autotag rules list --status confirmed"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    #[arg(long, global = true, help = "Path to a TOML config file (autotag.toml by default)")]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the database url")]
    pub database_url: Option<String>,
    #[arg(long, global = true, help = "Override the log level")]
    pub log_level: Option<String>,
}

impl GlobalArgs {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            require_file: self.config.is_some(),
            config_path: self.config.clone(),
            overrides: ConfigOverrides {
                database_url: self.database_url.clone(),
                log_level: self.log_level.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations")]
    Migrate,
    #[command(about = "Load the deterministic demo dataset and verify it")]
    Seed,
    #[command(about = "Show effective configuration values with their source; secrets redacted")]
    Config,
    #[command(about = "Run deterministic rule matching for one line or a batch of lines")]
    Recommend(commands::recommend::RecommendArgs),
    #[command(about = "History-aware suggestions: statistics plus the external oracle if enabled")]
    Suggest(commands::suggest::SuggestArgs),
    #[command(about = "Evaluate every rule against a line and report matches and near misses")]
    Explain(commands::explain::ExplainArgs),
    #[command(about = "Record a transaction line, auto-assigning a cost center when none is given")]
    Record(commands::record::RecordArgs),
    #[command(subcommand, about = "Create, edit and move rules through their lifecycle")]
    Rules(RulesCommand),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.global.load_options();
    logging::init(&options);

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(&options),
        Command::Seed => commands::seed::run(&options),
        Command::Config => commands::config::run(&options),
        Command::Recommend(args) => commands::recommend::run(&options, args),
        Command::Suggest(args) => commands::suggest::run(&options, args),
        Command::Explain(args) => commands::explain::run(&options, args),
        Command::Record(args) => commands::record::run(&options, args),
        Command::Rules(command) => commands::rules::run(&options, command),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
