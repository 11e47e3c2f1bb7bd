use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};
use tracing::debug;

use autotag_core::domain::analytics::AnalyticsId;
use autotag_core::domain::history::{
    DocumentKind, DocumentStatus, HistoricalRecord, TransactionLineId, TERMINAL_DOCUMENT_STATUSES,
};
use autotag_core::domain::partner::PartnerId;
use autotag_core::domain::product::ProductId;
use autotag_core::ports::{LookupError, TransactionHistory};

use super::{decode_column, parse_date, parse_decimal, RepositoryError};
use crate::DbPool;

const SELECT_HISTORY: &str = "SELECT tl.id, tl.document_date, p.name AS partner_name, \
     pr.name AS product_name, tl.analytics_id, a.name AS analytics_name, \
     a.kind AS analytics_kind, tl.amount, tl.auto_assigned \
     FROM transaction_line tl \
     JOIN analytics_account a ON a.id = tl.analytics_id \
     LEFT JOIN partner p ON p.id = tl.partner_id \
     LEFT JOIN product pr ON pr.id = tl.product_id";

/// A purchase order or vendor bill line to persist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTransactionLine {
    pub id: TransactionLineId,
    pub document_kind: DocumentKind,
    pub document_ref: String,
    pub document_status: DocumentStatus,
    pub document_date: NaiveDate,
    pub partner_id: Option<PartnerId>,
    pub product_id: Option<ProductId>,
    pub analytics_id: Option<AnalyticsId>,
    pub amount: Decimal,
    /// Whether the cost center came from a recommendation rather than a person.
    pub auto_assigned: bool,
    pub recorded_at: DateTime<Utc>,
}

pub struct SqlTransactionHistoryRepository {
    pool: DbPool,
}

impl SqlTransactionHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn record_line(&self, line: &NewTransactionLine) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO transaction_line (
                id, document_kind, document_ref, document_status, document_date, partner_id,
                product_id, analytics_id, amount, auto_assigned, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&line.id.0)
        .bind(line.document_kind.as_str())
        .bind(&line.document_ref)
        .bind(line.document_status.as_str())
        .bind(line.document_date.format("%Y-%m-%d").to_string())
        .bind(line.partner_id.as_ref().map(|id| id.0.as_str()))
        .bind(line.product_id.as_ref().map(|id| id.0.as_str()))
        .bind(line.analytics_id.as_ref().map(|id| id.0.as_str()))
        .bind(line.amount.to_string())
        .bind(i64::from(line.auto_assigned))
        .bind(line.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(
            event_name = "history.line.recorded",
            line_id = %line.id.0,
            status = line.document_status.as_str(),
            auto_assigned = line.auto_assigned,
            "transaction line recorded"
        );
        Ok(())
    }

    pub async fn for_partner(
        &self,
        partner: &PartnerId,
        limit: usize,
    ) -> Result<Vec<HistoricalRecord>, RepositoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_HISTORY);
        builder.push(" WHERE tl.partner_id = ");
        builder.push_bind(partner.0.as_str());
        finish_history_query(&mut builder, limit);

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    pub async fn for_products(
        &self,
        products: &[ProductId],
        limit: usize,
    ) -> Result<Vec<HistoricalRecord>, RepositoryError> {
        if limit == 0 || products.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_HISTORY);
        builder.push(" WHERE tl.product_id IN (");
        let mut ids = builder.separated(", ");
        for product in products {
            ids.push_bind(product.0.as_str());
        }
        ids.push_unseparated(")");
        finish_history_query(&mut builder, limit);

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }
}

#[async_trait::async_trait]
impl TransactionHistory for SqlTransactionHistoryRepository {
    async fn by_partner(
        &self,
        partner: &PartnerId,
        limit: usize,
    ) -> Result<Vec<HistoricalRecord>, LookupError> {
        Ok(self.for_partner(partner, limit).await?)
    }

    async fn by_products(
        &self,
        products: &[ProductId],
        limit: usize,
    ) -> Result<Vec<HistoricalRecord>, LookupError> {
        Ok(self.for_products(products, limit).await?)
    }
}

/// Restricts to terminal documents, newest first, capped at `limit`.
fn finish_history_query(builder: &mut QueryBuilder<'_, Sqlite>, limit: usize) {
    builder.push(" AND tl.document_status IN (");
    let mut statuses = builder.separated(", ");
    for status in TERMINAL_DOCUMENT_STATUSES {
        statuses.push_bind(status.as_str());
    }
    statuses.push_unseparated(")");
    builder.push(" ORDER BY tl.document_date DESC, tl.id DESC LIMIT ");
    builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
}

fn row_to_record(row: &SqliteRow) -> Result<HistoricalRecord, RepositoryError> {
    let date: String = decode_column("document_date", row.try_get("document_date"))?;
    let amount: String = decode_column("amount", row.try_get("amount"))?;
    let auto_assigned: i64 = decode_column("auto_assigned", row.try_get("auto_assigned"))?;

    Ok(HistoricalRecord {
        line_id: TransactionLineId(decode_column("id", row.try_get("id"))?),
        date: parse_date("document_date", &date)?,
        partner_name: decode_column("partner_name", row.try_get("partner_name"))?,
        product_name: decode_column("product_name", row.try_get("product_name"))?,
        analytics_id: AnalyticsId(decode_column("analytics_id", row.try_get("analytics_id"))?),
        analytics_name: decode_column("analytics_name", row.try_get("analytics_name"))?,
        analytics_kind: decode_column("analytics_kind", row.try_get("analytics_kind"))?,
        amount: parse_decimal("amount", &amount)?,
        auto_assigned: auto_assigned != 0,
    })
}
