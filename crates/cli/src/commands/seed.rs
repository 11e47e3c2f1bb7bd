use autotag_core::config::LoadOptions;
use autotag_db::{DemoSeedDataset, VerificationResult};

use crate::commands::{
    execute, open_database, CommandResult, Failure, EXIT_MIGRATION, EXIT_SEED_VERIFICATION,
};

pub fn run(options: &LoadOptions) -> CommandResult {
    execute("seed", options, |config| async move {
        let pool = open_database(&config).await?;

        let seeded = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| Failure::new("seed_execution", error.to_string(), EXIT_MIGRATION))?;
        let verification = DemoSeedDataset::verify(&pool).await.map_err(|error| {
            Failure::new("seed_verification", error.to_string(), EXIT_SEED_VERIFICATION)
        })?;
        pool.close().await;

        if !verification.all_present {
            return Err(Failure::new(
                "seed_verification",
                verification_message(&verification),
                EXIT_SEED_VERIFICATION,
            ));
        }

        let scenarios: Vec<String> = seeded
            .rules_seeded
            .iter()
            .map(|rule| format!("  - {}: {}", rule.rule_id, rule.scenario))
            .collect();
        Ok::<_, Failure>(CommandResult::with_data(
            "seed",
            format!("demo dataset loaded with rules:\n{}", scenarios.join("\n")),
            &seeded,
        ))
    })
}

fn verification_message(verification: &VerificationResult) -> String {
    let failed = verification.failed_checks();
    if failed.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed.join(", "))
    }
}
