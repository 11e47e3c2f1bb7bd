//! Read collaborators the recommendation core consumes.
//!
//! Persistence of partners, products, cost centers and transaction history is
//! owned elsewhere; these traits are the only way the core reaches it. Every
//! reference is resolved explicitly through a lookup, never assumed to carry
//! its resolved object.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::analytics::{AnalyticsAccount, AnalyticsId};
use crate::domain::history::HistoricalRecord;
use crate::domain::partner::{Partner, PartnerId};
use crate::domain::product::{CategoryId, Product, ProductCategory, ProductId};
use crate::domain::rule::{Rule, RuleId, RuleStatus};

/// A collaborator failed. "Not found" is never an error; lookups return `None`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("decode failure: {0}")]
    Decode(String),
}

#[async_trait]
pub trait PartnerLookup: Send + Sync {
    async fn get(&self, id: &PartnerId) -> Result<Option<Partner>, LookupError>;
}

#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn get(&self, id: &ProductId) -> Result<Option<Product>, LookupError>;

    async fn category(&self, id: &CategoryId) -> Result<Option<ProductCategory>, LookupError>;

    /// Every product currently filed under the category.
    async fn list_by_category(&self, id: &CategoryId) -> Result<Vec<ProductId>, LookupError>;
}

#[async_trait]
pub trait AnalyticsCatalog: Send + Sync {
    /// Cost centers that can still be assigned (archived ones excluded).
    async fn list_available(&self) -> Result<Vec<AnalyticsAccount>, LookupError>;

    async fn get(&self, id: &AnalyticsId) -> Result<Option<AnalyticsAccount>, LookupError>;
}

/// Confirmed past transaction lines, most recent first, capped at `limit`.
#[async_trait]
pub trait TransactionHistory: Send + Sync {
    async fn by_partner(
        &self,
        partner: &PartnerId,
        limit: usize,
    ) -> Result<Vec<HistoricalRecord>, LookupError>;

    async fn by_products(
        &self,
        products: &[ProductId],
        limit: usize,
    ) -> Result<Vec<HistoricalRecord>, LookupError>;
}

/// Persistence for rule definitions. Lifecycle guards live in
/// [`crate::rules::RuleService`]; the store only reads and writes.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Rules with status `confirmed`.
    async fn find_active(&self) -> Result<Vec<Rule>, LookupError>;

    async fn find_by_id(&self, id: &RuleId) -> Result<Option<Rule>, LookupError>;

    async fn list(&self, status: Option<RuleStatus>) -> Result<Vec<Rule>, LookupError>;

    async fn save(&self, rule: Rule) -> Result<(), LookupError>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: &RuleId) -> Result<bool, LookupError>;
}
