use std::collections::BTreeSet;

use sqlx::{sqlite::SqliteRow, Row};

use autotag_core::domain::partner::{Partner, PartnerId, TagId};
use autotag_core::ports::{LookupError, PartnerLookup};

use super::{decode_column, RepositoryError};
use crate::DbPool;

pub struct SqlPartnerRepository {
    pool: DbPool,
}

impl SqlPartnerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: &PartnerId) -> Result<Option<Partner>, RepositoryError> {
        let row = sqlx::query("SELECT id, name FROM partner WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let tag_rows = sqlx::query(
            "SELECT tag_id FROM partner_tag_link WHERE partner_id = ? ORDER BY tag_id ASC",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        let tag_ids = tag_rows
            .iter()
            .map(|tag| decode_column("tag_id", tag.try_get::<String, _>("tag_id")).map(TagId))
            .collect::<Result<BTreeSet<_>, _>>()?;

        row_to_partner(&row, tag_ids).map(Some)
    }
}

#[async_trait::async_trait]
impl PartnerLookup for SqlPartnerRepository {
    async fn get(&self, id: &PartnerId) -> Result<Option<Partner>, LookupError> {
        Ok(self.find_by_id(id).await?)
    }
}

fn row_to_partner(row: &SqliteRow, tag_ids: BTreeSet<TagId>) -> Result<Partner, RepositoryError> {
    Ok(Partner {
        id: PartnerId(decode_column("id", row.try_get("id"))?),
        name: decode_column("name", row.try_get("name"))?,
        tag_ids,
    })
}

#[cfg(test)]
mod tests {
    use autotag_core::domain::partner::{PartnerId, TagId};
    use autotag_core::ports::PartnerLookup;

    use super::SqlPartnerRepository;
    use crate::repositories::test_pool;

    #[tokio::test]
    async fn loads_partner_with_its_tags() {
        let repo = SqlPartnerRepository::new(test_pool::seeded().await);

        let azure = repo
            .get(&PartnerId("partner-azure".to_string()))
            .await
            .expect("lookup")
            .expect("seeded partner");

        assert_eq!(azure.name, "Azure Interior");
        assert!(azure.tag_ids.contains(&TagId("tag-vip".to_string())));
    }

    #[tokio::test]
    async fn untagged_partner_has_empty_tag_set() {
        let repo = SqlPartnerRepository::new(test_pool::seeded().await);

        let bright = repo
            .get(&PartnerId("partner-bright".to_string()))
            .await
            .expect("lookup")
            .expect("seeded partner");

        assert!(bright.tag_ids.is_empty());
    }

    #[tokio::test]
    async fn unknown_partner_is_none_not_error() {
        let repo = SqlPartnerRepository::new(test_pool::migrated().await);

        let missing = repo.get(&PartnerId("partner-ghost".to_string())).await.expect("lookup");
        assert!(missing.is_none());
    }
}
