use autotag_core::config::LoadOptions;
use autotag_db::migrations;

use crate::commands::{execute, open_database, CommandResult, Failure, EXIT_MIGRATION};

pub fn run(options: &LoadOptions) -> CommandResult {
    execute("migrate", options, |config| async move {
        let pool = open_database(&config).await?;
        let applied = migrations::applied_count(&pool)
            .await
            .map_err(|error| Failure::new("migration", error.to_string(), EXIT_MIGRATION))?;
        pool.close().await;

        Ok::<_, Failure>(CommandResult::success(
            "migrate",
            format!("applied pending migrations ({applied} total)"),
        ))
    })
}
