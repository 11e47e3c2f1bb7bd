use serde::Serialize;
use tracing::info;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Row counts the demo dataset must produce, keyed by table.
const SEED_TABLE_COUNTS: &[(&str, i64)] = &[
    ("partner", 3),
    ("partner_tag", 2),
    ("partner_tag_link", 2),
    ("product_category", 3),
    ("product", 5),
    ("analytics_account", 4),
    ("analytic_rule", 4),
    ("transaction_line", 9),
];

/// Rules the end-to-end scenarios depend on, with their expected status and target.
const SEED_RULES: &[SeedRuleContract] = &[
    SeedRuleContract {
        rule_id: "rule-azure-diwali",
        status: "confirmed",
        analytics_id: "an-diwali",
        scenario: "partner Azure Interior -> Diwali",
    },
    SeedRuleContract {
        rule_id: "rule-azure-wooden-diwali",
        status: "confirmed",
        analytics_id: "an-diwali",
        scenario: "Azure Interior + Wooden Furniture -> Diwali (most specific)",
    },
    SeedRuleContract {
        rule_id: "rule-wooden-expo",
        status: "confirmed",
        analytics_id: "an-furniture-expo",
        scenario: "Wooden Furniture -> Furniture Expo",
    },
    SeedRuleContract {
        rule_id: "rule-lamps-draft",
        status: "draft",
        analytics_id: "an-office",
        scenario: "draft rule that must never win",
    },
];

struct SeedRuleContract {
    rule_id: &'static str,
    status: &'static str,
    analytics_id: &'static str,
    scenario: &'static str,
}

/// Deterministic demo dataset: vendors, products, cost centers, rules and
/// confirmed purchase history for the walkthrough scenarios.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed.sql");

    /// Applies the dataset in one transaction. Re-running it is a no-op.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        sqlx::raw_sql(Self::SQL).execute(&mut *tx).await?;
        tx.commit().await?;

        let rules_seeded = SEED_RULES
            .iter()
            .map(|rule| SeededRule { rule_id: rule.rule_id, scenario: rule.scenario })
            .collect::<Vec<_>>();

        info!(
            event_name = "seed.demo.loaded",
            rules = rules_seeded.len(),
            "demo dataset loaded"
        );
        Ok(SeedResult { rules_seeded })
    }

    /// Checks that every seeded row exists and the scenario rules are intact.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for (table, expected) in SEED_TABLE_COUNTS {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(1) FROM {table}"))
                .fetch_one(pool)
                .await?;
            checks.push(VerificationCheck {
                name: format!("{table}.count"),
                passed: count >= *expected,
            });
        }

        for rule in SEED_RULES {
            let intact: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM analytic_rule \
                 WHERE id = ?1 AND status = ?2 AND analytics_id = ?3)",
            )
            .bind(rule.rule_id)
            .bind(rule.status)
            .bind(rule.analytics_id)
            .fetch_one(pool)
            .await?;
            checks.push(VerificationCheck { name: rule.rule_id.to_string(), passed: intact == 1 });
        }

        let all_present = checks.iter().all(|check| check.passed);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SeedResult {
    pub rules_seeded: Vec<SeededRule>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SeededRule {
    pub rule_id: &'static str,
    pub scenario: &'static str,
}

#[derive(Clone, Debug, Serialize)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<VerificationCheck>,
}

#[derive(Clone, Debug, Serialize)]
pub struct VerificationCheck {
    pub name: String,
    pub passed: bool,
}

impl VerificationResult {
    pub fn failed_checks(&self) -> Vec<&str> {
        self.checks.iter().filter(|check| !check.passed).map(|check| check.name.as_str()).collect()
    }
}
