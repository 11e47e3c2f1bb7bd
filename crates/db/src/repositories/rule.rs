use sqlx::{sqlite::SqliteRow, Row};

use autotag_core::domain::analytics::AnalyticsId;
use autotag_core::domain::partner::{PartnerId, TagId};
use autotag_core::domain::product::{CategoryId, ProductId};
use autotag_core::domain::rule::{Rule, RuleConditions, RuleId, RuleStatus};
use autotag_core::ports::{LookupError, RuleStore};

use super::{decode_column, parse_timestamp, RepositoryError};
use crate::DbPool;

const SELECT_RULE: &str = "SELECT id, name, description, partner_id, partner_tag_id, product_id, \
     product_category_id, analytics_id, status, created_at, updated_at FROM analytic_rule";

pub struct SqlRuleRepository {
    pool: DbPool,
}

impl SqlRuleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_status(
        &self,
        status: Option<RuleStatus>,
    ) -> Result<Vec<Rule>, RepositoryError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "{SELECT_RULE} WHERE status = ? ORDER BY updated_at DESC, id ASC"
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("{SELECT_RULE} ORDER BY updated_at DESC, id ASC"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(row_to_rule).collect()
    }

    pub async fn find_one(&self, id: &RuleId) -> Result<Option<Rule>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_RULE} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_rule).transpose()
    }

    pub async fn upsert(&self, rule: &Rule) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO analytic_rule (
                id, name, description, partner_id, partner_tag_id, product_id,
                product_category_id, analytics_id, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                partner_id = excluded.partner_id,
                partner_tag_id = excluded.partner_tag_id,
                product_id = excluded.product_id,
                product_category_id = excluded.product_category_id,
                analytics_id = excluded.analytics_id,
                status = excluded.status,
                updated_at = excluded.updated_at",
        )
        .bind(&rule.id.0)
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(rule.conditions.partner_id.as_ref().map(|id| id.0.as_str()))
        .bind(rule.conditions.partner_tag_id.as_ref().map(|id| id.0.as_str()))
        .bind(rule.conditions.product_id.as_ref().map(|id| id.0.as_str()))
        .bind(rule.conditions.product_category_id.as_ref().map(|id| id.0.as_str()))
        .bind(&rule.analytics_id.0)
        .bind(rule.status.as_str())
        .bind(rule.created_at.to_rfc3339())
        .bind(rule.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn remove(&self, id: &RuleId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM analytic_rule WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl RuleStore for SqlRuleRepository {
    async fn find_active(&self) -> Result<Vec<Rule>, LookupError> {
        Ok(self.find_by_status(Some(RuleStatus::Confirmed)).await?)
    }

    async fn find_by_id(&self, id: &RuleId) -> Result<Option<Rule>, LookupError> {
        Ok(self.find_one(id).await?)
    }

    async fn list(&self, status: Option<RuleStatus>) -> Result<Vec<Rule>, LookupError> {
        Ok(self.find_by_status(status).await?)
    }

    async fn save(&self, rule: Rule) -> Result<(), LookupError> {
        Ok(self.upsert(&rule).await?)
    }

    async fn delete(&self, id: &RuleId) -> Result<bool, LookupError> {
        Ok(self.remove(id).await?)
    }
}

fn row_to_rule(row: &SqliteRow) -> Result<Rule, RepositoryError> {
    let status_raw: String = decode_column("status", row.try_get("status"))?;
    let status = RuleStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown rule status `{status_raw}`")))?;
    let created_at: String = decode_column("created_at", row.try_get("created_at"))?;
    let updated_at: String = decode_column("updated_at", row.try_get("updated_at"))?;

    let partner_id: Option<String> = decode_column("partner_id", row.try_get("partner_id"))?;
    let partner_tag_id: Option<String> =
        decode_column("partner_tag_id", row.try_get("partner_tag_id"))?;
    let product_id: Option<String> = decode_column("product_id", row.try_get("product_id"))?;
    let product_category_id: Option<String> =
        decode_column("product_category_id", row.try_get("product_category_id"))?;

    Ok(Rule {
        id: RuleId(decode_column("id", row.try_get("id"))?),
        name: decode_column("name", row.try_get("name"))?,
        description: decode_column("description", row.try_get("description"))?,
        conditions: RuleConditions {
            partner_id: partner_id.map(PartnerId),
            partner_tag_id: partner_tag_id.map(TagId),
            product_id: product_id.map(ProductId),
            product_category_id: product_category_id.map(CategoryId),
        },
        analytics_id: AnalyticsId(decode_column("analytics_id", row.try_get("analytics_id"))?),
        status,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use autotag_core::domain::analytics::AnalyticsId;
    use autotag_core::domain::product::CategoryId;
    use autotag_core::domain::rule::{Rule, RuleConditions, RuleId, RuleStatus};
    use autotag_core::ports::RuleStore;

    use super::SqlRuleRepository;
    use crate::repositories::test_pool;

    fn lighting_rule() -> Rule {
        Rule::draft(
            "Lighting to the expo",
            Some("stand lighting".to_string()),
            RuleConditions {
                product_category_id: Some(CategoryId("cat-lighting".to_string())),
                ..RuleConditions::default()
            },
            AnalyticsId("an-furniture-expo".to_string()),
            Utc::now(),
        )
        .expect("valid draft")
    }

    #[tokio::test]
    async fn active_rules_are_confirmed_only_most_recent_first() {
        let repo = SqlRuleRepository::new(test_pool::seeded().await);

        let ids: Vec<String> =
            repo.find_active().await.expect("list").into_iter().map(|rule| rule.id.0).collect();

        assert_eq!(
            ids,
            vec!["rule-wooden-expo", "rule-azure-diwali", "rule-azure-wooden-diwali"]
        );
    }

    #[tokio::test]
    async fn save_round_trips_conditions_and_updates_in_place() {
        let repo = SqlRuleRepository::new(test_pool::seeded().await);
        let mut rule = lighting_rule();
        repo.save(rule.clone()).await.expect("insert");

        let loaded = repo.find_by_id(&rule.id).await.expect("lookup").expect("stored");
        assert_eq!(loaded.conditions, rule.conditions);
        assert_eq!(loaded.description.as_deref(), Some("stand lighting"));
        assert_eq!(loaded.status, RuleStatus::Draft);

        rule.transition_to(RuleStatus::Confirmed, rule.updated_at + Duration::seconds(5))
            .expect("confirm");
        repo.save(rule.clone()).await.expect("update");

        let loaded = repo.find_by_id(&rule.id).await.expect("lookup").expect("stored");
        assert_eq!(loaded.status, RuleStatus::Confirmed);
        assert_eq!(loaded.updated_at.timestamp(), rule.updated_at.timestamp());
        assert_eq!(repo.list(None).await.expect("list").len(), 5);
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_was_removed() {
        let repo = SqlRuleRepository::new(test_pool::seeded().await);
        let id = RuleId("rule-lamps-draft".to_string());

        assert!(repo.delete(&id).await.expect("delete"));
        assert!(!repo.delete(&id).await.expect("second delete"));
        assert!(repo.find_by_id(&id).await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let repo = SqlRuleRepository::new(test_pool::seeded().await);

        let drafts = repo.list(Some(RuleStatus::Draft)).await.expect("list");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id.0, "rule-lamps-draft");
    }
}
