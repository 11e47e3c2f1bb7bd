//! SQL implementations of the read ports and the rule store.
//!
//! Each repository exposes inherent methods returning [`RepositoryError`]; the
//! port impls delegate to them and convert into [`LookupError`].

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use autotag_core::ports::LookupError;

pub mod analytics;
pub mod history;
pub mod memory;
pub mod partner;
pub mod product;
pub mod rule;

pub use analytics::SqlAnalyticsRepository;
pub use history::{NewTransactionLine, SqlTransactionHistoryRepository};
pub use memory::{InMemoryAnalyticsCatalog, InMemoryRuleRepository};
pub use partner::SqlPartnerRepository;
pub use product::SqlProductRepository;
pub use rule::SqlRuleRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for LookupError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(error) => Self::Unavailable(error.to_string()),
            RepositoryError::Decode(message) => Self::Decode(message),
        }
    }
}

pub(crate) fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid {column} `{raw}`: {error}")))
}

pub(crate) fn parse_date(column: &str, raw: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|error| RepositoryError::Decode(format!("invalid {column} `{raw}`: {error}")))
}

pub(crate) fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    raw.parse::<Decimal>()
        .map_err(|error| RepositoryError::Decode(format!("invalid {column} `{raw}`: {error}")))
}

pub(crate) fn decode_column<T>(
    column: &str,
    result: Result<T, sqlx::Error>,
) -> Result<T, RepositoryError> {
    result.map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
}

#[cfg(test)]
pub(crate) mod test_pool {
    use crate::{connect_with_settings, migrations, DbPool, DemoSeedDataset};

    pub async fn migrated() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        pool
    }

    pub async fn seeded() -> DbPool {
        let pool = migrated().await;
        DemoSeedDataset::load(&pool).await.expect("seed");
        pool
    }
}

#[cfg(test)]
mod tests {
    use autotag_core::ports::LookupError;

    use super::{parse_date, parse_decimal, parse_timestamp, RepositoryError};

    #[test]
    fn decode_failures_map_to_lookup_decode() {
        let error = parse_date("document_date", "03/06/2024").expect_err("not iso");
        assert!(matches!(
            LookupError::from(error),
            LookupError::Decode(message) if message.contains("document_date")
        ));
    }

    #[test]
    fn database_failures_map_to_unavailable() {
        let error = RepositoryError::Database(sqlx::Error::PoolTimedOut);
        assert!(matches!(LookupError::from(error), LookupError::Unavailable(_)));
    }

    #[test]
    fn parses_stored_column_formats() {
        assert!(parse_timestamp("updated_at", "2024-09-01T10:00:00+00:00").is_ok());
        assert_eq!(parse_decimal("amount", "1250.00").expect("decimal").to_string(), "1250.00");
        assert!(parse_decimal("amount", "twelve").is_err());
    }
}
