use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::analytics::AnalyticsId;
use crate::domain::history::{HistoricalRecord, TransactionLineId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAxis {
    Partner,
    Product,
    Category,
}

impl HistoryAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Partner => "partner",
            Self::Product => "product",
            Self::Category => "category",
        }
    }
}

/// How often one cost-center shows up in a set of history lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsUsagePattern {
    pub analytics_id: AnalyticsId,
    pub analytics_name: String,
    pub count: usize,
    pub total_amount: Decimal,
    pub auto_assigned_count: usize,
}

impl AnalyticsUsagePattern {
    pub fn auto_assigned_rate(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.auto_assigned_count as f64 / self.count as f64
    }
}

/// Aggregates lines per cost-center, ranked by count desc, then total amount
/// desc, then id asc.
pub fn aggregate_usage<'a>(
    records: impl IntoIterator<Item = &'a HistoricalRecord>,
) -> Vec<AnalyticsUsagePattern> {
    let mut by_id: HashMap<&AnalyticsId, AnalyticsUsagePattern> = HashMap::new();
    for record in records {
        let pattern = by_id.entry(&record.analytics_id).or_insert_with(|| {
            AnalyticsUsagePattern {
                analytics_id: record.analytics_id.clone(),
                analytics_name: record.analytics_name.clone(),
                count: 0,
                total_amount: Decimal::ZERO,
                auto_assigned_count: 0,
            }
        });
        pattern.count += 1;
        pattern.total_amount += record.amount;
        if record.auto_assigned {
            pattern.auto_assigned_count += 1;
        }
    }

    let mut patterns = by_id.into_values().collect::<Vec<_>>();
    patterns.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| b.total_amount.cmp(&a.total_amount))
            .then_with(|| a.analytics_id.cmp(&b.analytics_id))
    });
    patterns
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub partner_count: usize,
    pub product_count: usize,
    pub category_count: usize,
    pub most_used: Option<AnalyticsUsagePattern>,
    pub has_relevant_history: bool,
}

/// Everything the analyzer found for one context.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalDataBundle {
    pub partner_history: Vec<HistoricalRecord>,
    pub product_history: Vec<HistoricalRecord>,
    pub category_history: Vec<HistoricalRecord>,
    pub usage_patterns: Vec<AnalyticsUsagePattern>,
    pub summary: HistorySummary,
    /// Axes whose query failed; a non-empty list forces
    /// `summary.has_relevant_history` to false.
    pub failed_axes: Vec<HistoryAxis>,
}

impl HistoricalDataBundle {
    /// Derives usage patterns and the summary from the three axis lists. A
    /// line seen on several axes is counted once.
    pub fn assemble(
        partner_history: Vec<HistoricalRecord>,
        product_history: Vec<HistoricalRecord>,
        category_history: Vec<HistoricalRecord>,
        failed_axes: Vec<HistoryAxis>,
    ) -> Self {
        let usage_patterns = {
            let mut seen: BTreeSet<&TransactionLineId> = BTreeSet::new();
            aggregate_usage(
                partner_history
                    .iter()
                    .chain(product_history.iter())
                    .chain(category_history.iter())
                    .filter(|record| seen.insert(&record.line_id)),
            )
        };

        let any_lines = !usage_patterns.is_empty();
        let summary = HistorySummary {
            partner_count: partner_history.len(),
            product_count: product_history.len(),
            category_count: category_history.len(),
            most_used: usage_patterns.first().cloned(),
            has_relevant_history: any_lines && failed_axes.is_empty(),
        };

        Self {
            partner_history,
            product_history,
            category_history,
            usage_patterns,
            summary,
            failed_axes,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.partner_history.is_empty()
            && self.product_history.is_empty()
            && self.category_history.is_empty()
    }
}
