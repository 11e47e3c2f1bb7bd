use sqlx::{sqlite::SqliteRow, Row};

use autotag_core::domain::product::{CategoryId, Product, ProductCategory, ProductId};
use autotag_core::ports::{LookupError, ProductLookup};

use super::{decode_column, RepositoryError};
use crate::DbPool;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, category_id FROM product WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    pub async fn find_category(
        &self,
        id: &CategoryId,
    ) -> Result<Option<ProductCategory>, RepositoryError> {
        let row = sqlx::query("SELECT id, name FROM product_category WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(ProductCategory {
                id: CategoryId(decode_column("id", row.try_get("id"))?),
                name: decode_column("name", row.try_get("name"))?,
            })
        })
        .transpose()
    }

    pub async fn ids_in_category(
        &self,
        id: &CategoryId,
    ) -> Result<Vec<ProductId>, RepositoryError> {
        let rows = sqlx::query("SELECT id FROM product WHERE category_id = ? ORDER BY id ASC")
            .bind(&id.0)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| decode_column("id", row.try_get::<String, _>("id")).map(ProductId))
            .collect()
    }
}

#[async_trait::async_trait]
impl ProductLookup for SqlProductRepository {
    async fn get(&self, id: &ProductId) -> Result<Option<Product>, LookupError> {
        Ok(self.find_by_id(id).await?)
    }

    async fn category(&self, id: &CategoryId) -> Result<Option<ProductCategory>, LookupError> {
        Ok(self.find_category(id).await?)
    }

    async fn list_by_category(&self, id: &CategoryId) -> Result<Vec<ProductId>, LookupError> {
        Ok(self.ids_in_category(id).await?)
    }
}

fn row_to_product(row: &SqliteRow) -> Result<Product, RepositoryError> {
    let category_id: Option<String> = decode_column("category_id", row.try_get("category_id"))?;
    Ok(Product {
        id: ProductId(decode_column("id", row.try_get("id"))?),
        name: decode_column("name", row.try_get("name"))?,
        category_id: category_id.map(CategoryId),
    })
}
