//! Confidence scoring for statistical suggestions.

use std::cmp::Ordering;

use super::types::{AnalyticsUsagePattern, HistoricalDataBundle};
use super::{CONSISTENCY_WEIGHT, FREQUENCY_SATURATION, FREQUENCY_WEIGHT};
use crate::domain::recommendation::{Recommendation, RecommendationSource};

/// `0.7 * min(count / 10, 1) + 0.3 * (auto_assigned / count)`
pub fn pattern_confidence(pattern: &AnalyticsUsagePattern) -> f64 {
    if pattern.count == 0 {
        return 0.0;
    }
    let frequency = (pattern.count as f64 / FREQUENCY_SATURATION as f64).min(1.0);
    let confidence =
        FREQUENCY_WEIGHT * frequency + CONSISTENCY_WEIGHT * pattern.auto_assigned_rate();
    confidence.clamp(0.0, 1.0)
}

pub fn usage_reason(pattern: &AnalyticsUsagePattern) -> String {
    let times = if pattern.count == 1 { "time" } else { "times" };
    format!(
        "Used {} {times} in similar transactions ({:.0}% auto-assigned)",
        pattern.count,
        pattern.auto_assigned_rate() * 100.0
    )
}

/// Top `limit` cost-centers by confidence. Ties fall back to usage count, then
/// id, so the same bundle always yields the same ranking.
pub fn statistical_recommendations(
    bundle: &HistoricalDataBundle,
    limit: usize,
) -> Vec<Recommendation> {
    let mut scored = bundle
        .usage_patterns
        .iter()
        .filter(|pattern| pattern.count > 0)
        .map(|pattern| (pattern_confidence(pattern), pattern))
        .collect::<Vec<_>>();

    scored.sort_by(|(left_score, left), (right_score, right)| {
        right_score
            .partial_cmp(left_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| right.count.cmp(&left.count))
            .then_with(|| left.analytics_id.cmp(&right.analytics_id))
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(confidence, pattern)| Recommendation {
            analytics_id: pattern.analytics_id.clone(),
            analytics_name: pattern.analytics_name.clone(),
            confidence,
            reason: usage_reason(pattern),
            source: RecommendationSource::Statistical,
        })
        .collect()
}
