use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::parse::parse_reply;
use super::prompt::render_prompt;
use super::types::{
    HistoryOptions, LineRef, RecommendationResult, RecommendationStage, RichRecommendationResult,
    RuleReport,
};
use crate::context::ContextBuilder;
use crate::domain::analytics::AnalyticsAccount;
use crate::domain::context::DescribedContext;
use crate::domain::partner::PartnerId;
use crate::domain::product::ProductId;
use crate::domain::recommendation::Recommendation;
use crate::domain::rule::{Rule, RuleStatus};
use crate::errors::ApplicationError;
use crate::history::{statistical_recommendations, HistoricalDataBundle, HistoryAnalyzer};
use crate::matching::{active_matches, evaluate_all, explain_winner, select_winner, RuleSnapshot};
use crate::oracle::{ExternalOracle, OracleConfig, OracleError};
use crate::ports::{
    AnalyticsCatalog, PartnerLookup, ProductLookup, RuleStore, TransactionHistory,
};

pub const NO_RULES_MATCHED: &str = "no rules matched";

/// Read collaborators the orchestrator is wired with.
#[derive(Clone)]
pub struct RecommenderPorts {
    pub partners: Arc<dyn PartnerLookup>,
    pub products: Arc<dyn ProductLookup>,
    pub rules: Arc<dyn RuleStore>,
    pub history: Arc<dyn TransactionHistory>,
    pub catalog: Arc<dyn AnalyticsCatalog>,
}

#[derive(Clone)]
pub struct Recommender {
    contexts: ContextBuilder,
    history: HistoryAnalyzer,
    rules: Arc<dyn RuleStore>,
    catalog: Arc<dyn AnalyticsCatalog>,
    oracle: Option<Arc<dyn ExternalOracle>>,
    oracle_config: OracleConfig,
    options: HistoryOptions,
}

impl Recommender {
    pub fn new(ports: RecommenderPorts, oracle_config: OracleConfig) -> Self {
        Self {
            contexts: ContextBuilder::new(ports.partners, ports.products.clone()),
            history: HistoryAnalyzer::new(ports.history, ports.products),
            rules: ports.rules,
            catalog: ports.catalog,
            oracle: None,
            oracle_config,
            options: HistoryOptions::default(),
        }
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn ExternalOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_history_options(mut self, options: HistoryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn oracle_config(&self) -> &OracleConfig {
        &self.oracle_config
    }

    pub fn history_options(&self) -> HistoryOptions {
        self.options
    }

    /// Provider label when the oracle is both enabled and wired.
    pub fn provider(&self) -> Option<String> {
        if !self.oracle_config.enabled {
            return None;
        }
        self.oracle.as_ref().map(|oracle| oracle.provider().to_string())
    }

    /// Resolves references softly: a failing lookup becomes a missing field.
    pub async fn describe(
        &self,
        product: Option<&ProductId>,
        partner: Option<&PartnerId>,
    ) -> DescribedContext {
        self.contexts.build_lenient(product, partner).await
    }

    /// Deterministic path used inline when a transaction line is created.
    ///
    /// Only a failure to load the rule set aborts; everything after "no rule
    /// matched" degrades to no suggestion.
    pub async fn recommend(
        &self,
        product: Option<&ProductId>,
        partner: Option<&PartnerId>,
    ) -> Result<RecommendationResult, ApplicationError> {
        let described = self.describe(product, partner).await;
        enter(RecommendationStage::ContextBuilt);

        let rules = self.rules.find_active().await?;
        Ok(self.recommend_in_context(described, &rules).await)
    }

    /// Recommends every line of one document concurrently against a single
    /// snapshot of the active rules. Results keep input order.
    pub async fn recommend_batch(
        &self,
        lines: Vec<LineRef>,
    ) -> Result<Vec<RecommendationResult>, ApplicationError> {
        let snapshot = RuleSnapshot::new(self.rules.find_active().await?);
        let count = lines.len();
        info!(
            event_name = "recommend.batch.started",
            lines = count,
            active_rules = snapshot.len(),
            "batch recommendation started"
        );

        let mut tasks = JoinSet::new();
        for (index, line) in lines.into_iter().enumerate() {
            let recommender = self.clone();
            let snapshot = snapshot.clone();
            tasks.spawn(async move {
                let described = recommender
                    .describe(line.product_id.as_ref(), line.partner_id.as_ref())
                    .await;
                let result = recommender.recommend_in_context(described, snapshot.rules()).await;
                (index, result)
            });
        }

        let mut results: Vec<Option<RecommendationResult>> = (0..count).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined.map_err(|error| {
                ApplicationError::Integration(format!("batch recommendation task failed: {error}"))
            })?;
            results[index] = Some(result);
        }

        Ok(results.into_iter().flatten().collect())
    }

    /// History-aware path behind explicit "suggest" actions. Never fails:
    /// statistics are always computed and oracle problems land in `error`.
    pub async fn recommend_with_history(
        &self,
        described: &DescribedContext,
        available: &[AnalyticsAccount],
        options: HistoryOptions,
    ) -> RichRecommendationResult {
        let started = Instant::now();

        let bundle = self.history.gather(&described.context, options.historical_limit).await;
        enter(RecommendationStage::HistoryGathered);

        let statistical = statistical_recommendations(&bundle, options.max_results);
        let statistical_recommendations =
            if options.include_statistical { statistical } else { Vec::new() };

        let (recommendations, error) =
            match self.consult_oracle(described, available, &bundle, options.max_results).await {
                Ok(recommendations) => (recommendations, None),
                Err(error) => {
                    log_oracle_failure(&error, self.provider().as_deref());
                    (Vec::new(), Some(error.to_string()))
                }
            };
        let used = !recommendations.is_empty();
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        enter(RecommendationStage::Done);

        info!(
            event_name = "recommend.history.completed",
            used,
            ai_suggestions = recommendations.len(),
            statistical_suggestions = statistical_recommendations.len(),
            relevant_history = bundle.summary.has_relevant_history,
            duration_ms,
            "history-aware recommendation completed"
        );

        RichRecommendationResult {
            recommendations,
            statistical_recommendations,
            used,
            provider: self.provider(),
            error,
            duration_ms,
            history: bundle.summary,
        }
    }

    /// Resolves the references and the available catalog, then runs the
    /// history-aware path with the configured options.
    pub async fn suggest(
        &self,
        product: Option<&ProductId>,
        partner: Option<&PartnerId>,
    ) -> Result<RichRecommendationResult, ApplicationError> {
        let described = self.describe(product, partner).await;
        let available = self.catalog.list_available().await?;
        Ok(self.recommend_with_history(&described, &available, self.options).await)
    }

    /// Near-miss report: every rule evaluated against the context, with the
    /// winner among confirmed matches. Drafts can be previewed but never win.
    pub async fn explain_rules(
        &self,
        product: Option<&ProductId>,
        partner: Option<&PartnerId>,
        include_drafts: bool,
    ) -> Result<RuleReport, ApplicationError> {
        let described = self.describe(product, partner).await;
        let rules = if include_drafts {
            self.rules
                .list(None)
                .await?
                .into_iter()
                .filter(|rule| rule.status != RuleStatus::Archived)
                .collect::<Vec<_>>()
        } else {
            self.rules.find_active().await?
        };

        let evaluations = evaluate_all(&rules, &described.context);
        let matches = active_matches(&rules, &described.context);
        let winner = select_winner(&matches);
        let explanation = winner
            .map(|winner| explain_winner(winner, &matches))
            .unwrap_or_else(|| NO_RULES_MATCHED.to_string());
        let winner = winner.map(|winner| winner.rule.id.clone());

        Ok(RuleReport { context: described, evaluations, winner, explanation })
    }

    async fn recommend_in_context(
        &self,
        described: DescribedContext,
        rules: &[Rule],
    ) -> RecommendationResult {
        let all_matches = active_matches(rules, &described.context);
        enter(RecommendationStage::RulesEvaluated);

        if let Some(winner) = select_winner(&all_matches).cloned() {
            enter(RecommendationStage::Matched);
            let explanation = explain_winner(&winner, &all_matches);
            info!(
                event_name = "recommend.rule.matched",
                rule_id = %winner.rule.id,
                analytics_id = %winner.rule.analytics_id,
                score = winner.score,
                candidates = all_matches.len(),
                "rule matched"
            );
            return RecommendationResult {
                analytics_id: Some(winner.rule.analytics_id.clone()),
                matched_rule: Some(winner.rule),
                all_matches,
                explanation,
                ai_recommendation: None,
            };
        }

        let ai_recommendation = self.advisory_suggestion(&described).await;
        let explanation = match &ai_recommendation {
            Some(suggestion) => format!(
                "{NO_RULES_MATCHED}; AI suggests \"{}\" ({:.0}% confidence) \
                 as an advisory recommendation that has not been applied",
                suggestion.analytics_name,
                suggestion.confidence * 100.0
            ),
            None => NO_RULES_MATCHED.to_string(),
        };
        enter(RecommendationStage::Done);

        RecommendationResult {
            analytics_id: None,
            matched_rule: None,
            all_matches,
            explanation,
            ai_recommendation,
        }
    }

    async fn advisory_suggestion(&self, described: &DescribedContext) -> Option<Recommendation> {
        if !self.oracle_config.enabled || self.oracle.is_none() {
            enter(RecommendationStage::OracleSkipped);
            return None;
        }

        let available = match self.catalog.list_available().await {
            Ok(available) => available,
            Err(error) => {
                warn!(
                    event_name = "recommend.catalog.failed",
                    error = %error,
                    "could not list cost centers; skipping AI suggestion"
                );
                return None;
            }
        };

        let bundle = self.history.gather(&described.context, self.options.historical_limit).await;
        enter(RecommendationStage::HistoryGathered);

        match self.consult_oracle(described, &available, &bundle, self.options.max_results).await {
            Ok(recommendations) => recommendations.into_iter().next(),
            Err(error) => {
                log_oracle_failure(&error, self.provider().as_deref());
                None
            }
        }
    }

    /// One bounded oracle call. No retry: a timeout is a failure.
    async fn consult_oracle(
        &self,
        described: &DescribedContext,
        available: &[AnalyticsAccount],
        bundle: &HistoricalDataBundle,
        max_results: usize,
    ) -> Result<Vec<Recommendation>, OracleError> {
        if !self.oracle_config.enabled {
            enter(RecommendationStage::OracleSkipped);
            return Err(OracleError::Disabled);
        }
        let Some(oracle) = &self.oracle else {
            enter(RecommendationStage::OracleSkipped);
            return Err(OracleError::NotConfigured);
        };
        if available.is_empty() {
            enter(RecommendationStage::OracleSkipped);
            debug!(event_name = "recommend.oracle.skipped", "no cost centers available");
            return Ok(Vec::new());
        }

        let prompt = render_prompt(described, available, bundle, max_results)?;
        let timeout = self.oracle_config.timeout;
        enter(RecommendationStage::OracleCalled);
        let reply = match tokio::time::timeout(timeout, oracle.complete(&prompt)).await {
            Ok(reply) => reply?,
            Err(_) => {
                return Err(OracleError::Timeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        };

        let parsed = parse_reply(&reply, available, max_results)?;
        if parsed.discarded > 0 {
            warn!(
                event_name = "recommend.oracle.discarded",
                provider = oracle.provider(),
                discarded = parsed.discarded,
                kept = parsed.recommendations.len(),
                "dropped oracle suggestions that failed validation"
            );
            if parsed.recommendations.is_empty() {
                return Err(OracleError::Malformed(
                    "no suggestion referenced an available cost center".to_string(),
                ));
            }
        }
        Ok(parsed.recommendations)
    }
}

fn enter(stage: RecommendationStage) {
    debug!(event_name = "recommend.stage", stage = stage.as_str(), "recommendation stage reached");
}

fn log_oracle_failure(error: &OracleError, provider: Option<&str>) {
    if matches!(error, OracleError::Disabled) {
        debug!(event_name = "recommend.oracle.disabled", "oracle disabled; statistics only");
        return;
    }
    warn!(
        event_name = "recommend.oracle.failed",
        provider = provider.unwrap_or("none"),
        error = %error,
        "oracle call failed; continuing without AI suggestion"
    );
}
