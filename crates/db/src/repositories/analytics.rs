use sqlx::{sqlite::SqliteRow, Row};

use autotag_core::domain::analytics::{AnalyticsAccount, AnalyticsId};
use autotag_core::ports::{AnalyticsCatalog, LookupError};

use super::{decode_column, RepositoryError};
use crate::DbPool;

const SELECT_ACCOUNT: &str = "SELECT id, name, description, kind, archived FROM analytics_account";

pub struct SqlAnalyticsRepository {
    pool: DbPool,
}

impl SqlAnalyticsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_unarchived(&self) -> Result<Vec<AnalyticsAccount>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_ACCOUNT} WHERE archived = 0 ORDER BY name, id"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_account).collect()
    }

    pub async fn find_by_id(
        &self,
        id: &AnalyticsId,
    ) -> Result<Option<AnalyticsAccount>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_ACCOUNT} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_account).transpose()
    }
}

#[async_trait::async_trait]
impl AnalyticsCatalog for SqlAnalyticsRepository {
    async fn list_available(&self) -> Result<Vec<AnalyticsAccount>, LookupError> {
        Ok(self.list_unarchived().await?)
    }

    async fn get(&self, id: &AnalyticsId) -> Result<Option<AnalyticsAccount>, LookupError> {
        Ok(self.find_by_id(id).await?)
    }
}

fn row_to_account(row: &SqliteRow) -> Result<AnalyticsAccount, RepositoryError> {
    let archived: i64 = decode_column("archived", row.try_get("archived"))?;
    Ok(AnalyticsAccount {
        id: AnalyticsId(decode_column("id", row.try_get("id"))?),
        name: decode_column("name", row.try_get("name"))?,
        description: decode_column("description", row.try_get("description"))?,
        kind: decode_column("kind", row.try_get("kind"))?,
        archived: archived != 0,
    })
}
