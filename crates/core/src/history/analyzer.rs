use std::sync::Arc;

use tracing::{debug, warn};

use super::types::{HistoricalDataBundle, HistoryAxis};
use crate::domain::context::TransactionContext;
use crate::domain::history::HistoricalRecord;
use crate::domain::product::ProductId;
use crate::ports::{LookupError, ProductLookup, TransactionHistory};

#[derive(Clone)]
pub struct HistoryAnalyzer {
    history: Arc<dyn TransactionHistory>,
    products: Arc<dyn ProductLookup>,
}

impl HistoryAnalyzer {
    pub fn new(history: Arc<dyn TransactionHistory>, products: Arc<dyn ProductLookup>) -> Self {
        Self { history, products }
    }

    /// Queries the partner, product and category axes, each capped at `limit`.
    /// A failing axis is logged and left empty.
    pub async fn gather(&self, context: &TransactionContext, limit: usize) -> HistoricalDataBundle {
        let (partner, product, category) = tokio::join!(
            self.partner_axis(context, limit),
            self.product_axis(context, limit),
            self.category_axis(context, limit),
        );

        let mut failed_axes = Vec::new();
        let partner_history = settle(HistoryAxis::Partner, partner, &mut failed_axes);
        let product_history = settle(HistoryAxis::Product, product, &mut failed_axes);
        let category_history = settle(HistoryAxis::Category, category, &mut failed_axes);

        let bundle = HistoricalDataBundle::assemble(
            partner_history,
            product_history,
            category_history,
            failed_axes,
        );
        debug!(
            event_name = "history.gathered",
            partner_lines = bundle.summary.partner_count,
            product_lines = bundle.summary.product_count,
            category_lines = bundle.summary.category_count,
            patterns = bundle.usage_patterns.len(),
            relevant = bundle.summary.has_relevant_history,
            "historical bundle assembled"
        );
        bundle
    }

    async fn partner_axis(
        &self,
        context: &TransactionContext,
        limit: usize,
    ) -> Result<Vec<HistoricalRecord>, LookupError> {
        match &context.partner_id {
            Some(partner_id) => self.history.by_partner(partner_id, limit).await,
            None => Ok(Vec::new()),
        }
    }

    async fn product_axis(
        &self,
        context: &TransactionContext,
        limit: usize,
    ) -> Result<Vec<HistoricalRecord>, LookupError> {
        match &context.product_id {
            Some(product_id) => {
                self.history.by_products(std::slice::from_ref(product_id), limit).await
            }
            None => Ok(Vec::new()),
        }
    }

    /// Two-step fan-out: category -> products -> lines.
    async fn category_axis(
        &self,
        context: &TransactionContext,
        limit: usize,
    ) -> Result<Vec<HistoricalRecord>, LookupError> {
        let Some(category_id) = &context.product_category_id else {
            return Ok(Vec::new());
        };

        let products: Vec<ProductId> = self.products.list_by_category(category_id).await?;
        if products.is_empty() {
            return Ok(Vec::new());
        }
        self.history.by_products(&products, limit).await
    }
}

fn settle(
    axis: HistoryAxis,
    outcome: Result<Vec<HistoricalRecord>, LookupError>,
    failed_axes: &mut Vec<HistoryAxis>,
) -> Vec<HistoricalRecord> {
    match outcome {
        Ok(records) => records,
        Err(error) => {
            warn!(
                event_name = "history.query.failed",
                axis = axis.as_str(),
                error = %error,
                "history query failed; continuing without this axis"
            );
            failed_axes.push(axis);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::HistoryAnalyzer;
    use crate::domain::analytics::AnalyticsId;
    use crate::domain::context::TransactionContext;
    use crate::domain::history::{HistoricalRecord, TransactionLineId};
    use crate::domain::partner::PartnerId;
    use crate::domain::product::{CategoryId, Product, ProductCategory, ProductId};
    use crate::history::{statistical_recommendations, HistoryAxis};
    use crate::ports::{LookupError, ProductLookup, TransactionHistory};

    fn record(
        n: u32,
        partner: &str,
        product: &str,
        analytics: &str,
        auto: bool,
    ) -> HistoricalRecord {
        HistoricalRecord {
            line_id: TransactionLineId(format!("{partner}-{product}-{n}")),
            date: NaiveDate::from_ymd_opt(2024, 8, n).expect("valid date"),
            partner_name: Some(partner.to_string()),
            product_name: Some(product.to_string()),
            analytics_id: AnalyticsId(analytics.to_string()),
            analytics_name: analytics.to_string(),
            analytics_kind: "event".to_string(),
            amount: Decimal::new(10_000, 2),
            auto_assigned: auto,
        }
    }

    struct Lines(Vec<(String, String, HistoricalRecord)>);

    #[async_trait]
    impl TransactionHistory for Lines {
        async fn by_partner(
            &self,
            partner: &PartnerId,
            limit: usize,
        ) -> Result<Vec<HistoricalRecord>, LookupError> {
            Ok(self
                .0
                .iter()
                .filter(|(p, _, _)| *p == partner.0)
                .map(|(_, _, record)| record.clone())
                .take(limit)
                .collect())
        }

        async fn by_products(
            &self,
            products: &[ProductId],
            limit: usize,
        ) -> Result<Vec<HistoricalRecord>, LookupError> {
            Ok(self
                .0
                .iter()
                .filter(|(_, product, _)| products.iter().any(|id| id.0 == *product))
                .map(|(_, _, record)| record.clone())
                .take(limit)
                .collect())
        }
    }

    struct FailingPartnerAxis(Lines);

    #[async_trait]
    impl TransactionHistory for FailingPartnerAxis {
        async fn by_partner(
            &self,
            _partner: &PartnerId,
            _limit: usize,
        ) -> Result<Vec<HistoricalRecord>, LookupError> {
            Err(LookupError::Unavailable("database is locked".to_string()))
        }

        async fn by_products(
            &self,
            products: &[ProductId],
            limit: usize,
        ) -> Result<Vec<HistoricalRecord>, LookupError> {
            self.0.by_products(products, limit).await
        }
    }

    struct Catalog;

    #[async_trait]
    impl ProductLookup for Catalog {
        async fn get(&self, _id: &ProductId) -> Result<Option<Product>, LookupError> {
            Ok(None)
        }

        async fn category(
            &self,
            _id: &CategoryId,
        ) -> Result<Option<ProductCategory>, LookupError> {
            Ok(None)
        }

        async fn list_by_category(&self, id: &CategoryId) -> Result<Vec<ProductId>, LookupError> {
            Ok(match id.0.as_str() {
                "wooden-furniture" => {
                    vec![ProductId("desk".to_string()), ProductId("chair".to_string())]
                }
                _ => Vec::new(),
            })
        }
    }

    fn lines() -> Lines {
        let entries = [
            (1, "azure", "desk", "diwali", true),
            (2, "azure", "desk", "diwali", true),
            (3, "azure", "lamp", "office", false),
            (4, "bright", "chair", "expo", false),
            (5, "bright", "chair", "expo", true),
        ];
        Lines(
            entries
                .into_iter()
                .map(|(n, partner, product, analytics, auto)| {
                    (
                        partner.to_string(),
                        product.to_string(),
                        record(n, partner, product, analytics, auto),
                    )
                })
                .collect(),
        )
    }

    fn context() -> TransactionContext {
        TransactionContext {
            partner_id: Some(PartnerId("azure".to_string())),
            product_id: Some(ProductId("desk".to_string())),
            product_category_id: Some(CategoryId("wooden-furniture".to_string())),
            ..TransactionContext::default()
        }
    }

    #[tokio::test]
    async fn gathers_all_three_axes() {
        let analyzer = HistoryAnalyzer::new(Arc::new(lines()), Arc::new(Catalog));

        let bundle = analyzer.gather(&context(), 20).await;

        assert_eq!(bundle.partner_history.len(), 3);
        assert_eq!(bundle.product_history.len(), 2);
        assert_eq!(bundle.category_history.len(), 4, "desk and chair lines");
        assert!(bundle.summary.has_relevant_history);
        let most_used = bundle.summary.most_used.as_ref().expect("a pattern");
        assert_eq!(most_used.analytics_id, AnalyticsId("diwali".to_string()));
        assert_eq!(most_used.count, 2, "lines shared across axes count once");
    }

    #[tokio::test]
    async fn each_axis_respects_the_limit() {
        let analyzer = HistoryAnalyzer::new(Arc::new(lines()), Arc::new(Catalog));

        let bundle = analyzer.gather(&context(), 1).await;

        assert_eq!(bundle.partner_history.len(), 1);
        assert_eq!(bundle.product_history.len(), 1);
        assert_eq!(bundle.category_history.len(), 1);
    }

    #[tokio::test]
    async fn failing_axis_degrades_to_partial_bundle() {
        let analyzer =
            HistoryAnalyzer::new(Arc::new(FailingPartnerAxis(lines())), Arc::new(Catalog));

        let bundle = analyzer.gather(&context(), 20).await;

        assert!(bundle.partner_history.is_empty());
        assert_eq!(bundle.product_history.len(), 2);
        assert_eq!(bundle.failed_axes, vec![HistoryAxis::Partner]);
        assert!(!bundle.summary.has_relevant_history);
        assert!(!statistical_recommendations(&bundle, 3).is_empty());
    }

    #[tokio::test]
    async fn empty_context_has_no_history() {
        let analyzer = HistoryAnalyzer::new(Arc::new(lines()), Arc::new(Catalog));

        let bundle = analyzer.gather(&TransactionContext::default(), 20).await;

        assert!(bundle.is_empty());
        assert!(!bundle.summary.has_relevant_history);
    }
}
