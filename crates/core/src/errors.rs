use thiserror::Error;

use crate::domain::analytics::AnalyticsId;
use crate::domain::rule::{RuleId, RuleStatus};
use crate::ports::LookupError;

/// Configuration-class failures. These abort rule create/update/confirm and
/// never reach the matching engine.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid rule transition from {from:?} to {to:?}")]
    InvalidRuleTransition { from: RuleStatus, to: RuleStatus },
    #[error("a rule needs at least one of partner, partner tag, product or product category")]
    RuleWithoutConditions,
    #[error("rule is {status:?} and can no longer be edited or deleted")]
    RuleNotEditable { status: RuleStatus },
    #[error("analytics account `{0}` does not exist or is archived")]
    UnknownAnalytics(AnalyticsId),
    #[error("rule `{0}` was not found")]
    RuleNotFound(RuleId),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<LookupError> for ApplicationError {
    fn from(value: LookupError) -> Self {
        Self::Persistence(value.to_string())
    }
}
