pub mod config;
pub mod context;
pub mod domain;
pub mod errors;
pub mod history;
pub mod matching;
pub mod oracle;
pub mod ports;
pub mod recommend;
pub mod rules;

#[cfg(test)]
mod test_support;

pub use context::ContextBuilder;
pub use domain::analytics::{AnalyticsAccount, AnalyticsId};
pub use domain::context::{DescribedContext, TransactionContext};
pub use domain::history::{DocumentKind, DocumentStatus, HistoricalRecord, TransactionLineId};
pub use domain::partner::{Partner, PartnerId, TagId};
pub use domain::product::{CategoryId, Product, ProductCategory, ProductId};
pub use domain::recommendation::{Recommendation, RecommendationSource};
pub use domain::rule::{Rule, RuleConditions, RuleId, RuleStatus};
pub use errors::{ApplicationError, DomainError};
pub use history::{HistoricalDataBundle, HistoryAnalyzer, HistorySummary};
pub use matching::{MatchField, MatchResult, RuleSnapshot};
pub use oracle::{ExternalOracle, OracleConfig, OracleError};
pub use ports::{
    AnalyticsCatalog, LookupError, PartnerLookup, ProductLookup, RuleStore, TransactionHistory,
};
pub use recommend::{
    HistoryOptions, LineRef, RecommendationResult, Recommender, RecommenderPorts,
    RichRecommendationResult, RuleReport,
};
pub use rules::{NewRule, RuleService, RuleUpdate};
