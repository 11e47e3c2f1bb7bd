use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Number of migrations recorded as applied.
pub async fn applied_count(pool: &DbPool) -> Result<i64, sqlx::Error> {
    let table_exists: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;
    if table_exists == 0 {
        return Ok(0);
    }

    sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::{applied_count, run_pending};
    use crate::{connect_with_settings, migrations::MIGRATOR, DbPool};

    const MANAGED_TABLES: &[&str] = &[
        "partner",
        "partner_tag",
        "partner_tag_link",
        "product_category",
        "product",
        "analytics_account",
        "analytic_rule",
        "transaction_line",
    ];

    const MANAGED_INDEXES: &[&str] = &[
        "idx_product_category_id",
        "idx_analytic_rule_status",
        "idx_transaction_line_partner_date",
        "idx_transaction_line_product_date",
    ];

    async fn migrated_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");
        pool
    }

    async fn object_count(pool: &DbPool, kind: &str, name: &str) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = ?1 AND name = ?2")
            .bind(kind)
            .bind(name)
            .fetch_one(pool)
            .await
            .expect("query sqlite_master")
    }

    #[tokio::test]
    async fn migrations_create_every_table_and_index() {
        let pool = migrated_pool().await;

        for table in MANAGED_TABLES {
            assert_eq!(object_count(&pool, "table", table).await, 1, "missing table {table}");
        }
        for index in MANAGED_INDEXES {
            assert_eq!(object_count(&pool, "index", index).await, 1, "missing index {index}");
        }
        assert_eq!(applied_count(&pool).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn running_twice_is_a_no_op() {
        let pool = migrated_pool().await;
        run_pending(&pool).await.expect("second run");
        assert_eq!(applied_count(&pool).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn rule_without_predicates_is_rejected_by_schema() {
        let pool = migrated_pool().await;
        sqlx::query("INSERT INTO analytics_account (id, name) VALUES ('an-1', 'Diwali')")
            .execute(&pool)
            .await
            .expect("insert account");

        let result = sqlx::query(
            "INSERT INTO analytic_rule (id, name, analytics_id, status, created_at, updated_at)
             VALUES ('rule-1', 'Catch all', 'an-1', 'draft', '2024-01-01T00:00:00+00:00',
                     '2024-01-01T00:00:00+00:00')",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err(), "check constraint should reject a rule without predicates");
    }

    #[tokio::test]
    async fn migrations_are_reversible() {
        let pool = migrated_pool().await;

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        for table in MANAGED_TABLES {
            assert_eq!(object_count(&pool, "table", table).await, 0, "table {table} survived");
        }
        assert_eq!(applied_count(&pool).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn migrations_up_down_up_preserves_schema_signature() {
        let pool = migrated_pool().await;
        let initial = schema_signature(&pool).await;
        assert_eq!(initial.len(), MANAGED_TABLES.len() + MANAGED_INDEXES.len());

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");
        assert!(schema_signature(&pool).await.is_empty());

        run_pending(&pool).await.expect("re-run migrations");
        assert_eq!(schema_signature(&pool).await, initial);
    }

    async fn schema_signature(pool: &DbPool) -> Vec<(String, String, String)> {
        let mut signature: Vec<(String, String, String)> = sqlx::query(
            "SELECT type, name, IFNULL(sql, '') AS sql
             FROM sqlite_master
             WHERE type IN ('table', 'index')",
        )
        .fetch_all(pool)
        .await
        .expect("load schema objects")
        .into_iter()
        .filter_map(|row| {
            let name = row.get::<String, _>("name");
            let managed = MANAGED_TABLES.contains(&name.as_str())
                || MANAGED_INDEXES.contains(&name.as_str());
            managed.then(|| (row.get::<String, _>("type"), name, row.get::<String, _>("sql")))
        })
        .collect();
        signature.sort();
        signature
    }
}
