use serde::{Deserialize, Serialize};

use crate::domain::analytics::AnalyticsId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    Rule,
    Statistical,
    Ai,
}

impl RecommendationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rule => "rule",
            Self::Statistical => "statistical",
            Self::Ai => "ai",
        }
    }
}

/// One ranked cost-center suggestion. `confidence` is always within `[0, 1]`
/// and `reason` is never empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub analytics_id: AnalyticsId,
    pub analytics_name: String,
    pub confidence: f64,
    pub reason: String,
    pub source: RecommendationSource,
}
