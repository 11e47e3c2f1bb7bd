use serde::{Deserialize, Serialize};

use crate::domain::analytics::AnalyticsId;
use crate::domain::context::DescribedContext;
use crate::domain::partner::PartnerId;
use crate::domain::product::ProductId;
use crate::domain::recommendation::Recommendation;
use crate::domain::rule::{Rule, RuleId};
use crate::history::{HistorySummary, DEFAULT_HISTORICAL_LIMIT, DEFAULT_STATISTICAL_LIMIT};
use crate::matching::MatchResult;

/// Outcome of the deterministic path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    /// Set only when a confirmed rule matched. AI output never lands here.
    pub analytics_id: Option<AnalyticsId>,
    pub matched_rule: Option<Rule>,
    pub all_matches: Vec<MatchResult>,
    pub explanation: String,
    /// Advisory only; never applied without confirmation.
    pub ai_recommendation: Option<Recommendation>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryOptions {
    pub historical_limit: usize,
    pub include_statistical: bool,
    pub max_results: usize,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            historical_limit: DEFAULT_HISTORICAL_LIMIT,
            include_statistical: true,
            max_results: DEFAULT_STATISTICAL_LIMIT,
        }
    }
}

/// Outcome of the history-aware path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RichRecommendationResult {
    /// Validated AI suggestions, best first.
    pub recommendations: Vec<Recommendation>,
    pub statistical_recommendations: Vec<Recommendation>,
    /// True when the oracle returned at least one valid suggestion.
    pub used: bool,
    pub provider: Option<String>,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub history: HistorySummary,
}

/// Every evaluated rule for one context, matches first, then near misses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleReport {
    pub context: DescribedContext,
    pub evaluations: Vec<MatchResult>,
    pub winner: Option<RuleId>,
    pub explanation: String,
}

/// One document line submitted to a batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRef {
    pub product_id: Option<ProductId>,
    pub partner_id: Option<PartnerId>,
}

/// Orchestrator state machine; logged at debug, no step retries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecommendationStage {
    ContextBuilt,
    RulesEvaluated,
    Matched,
    HistoryGathered,
    OracleCalled,
    OracleSkipped,
    Done,
}

impl RecommendationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContextBuilt => "context_built",
            Self::RulesEvaluated => "rules_evaluated",
            Self::Matched => "matched",
            Self::HistoryGathered => "history_gathered",
            Self::OracleCalled => "oracle_called",
            Self::OracleSkipped => "oracle_skipped",
            Self::Done => "done",
        }
    }
}
