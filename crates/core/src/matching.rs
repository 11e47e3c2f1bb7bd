//! Deterministic rule matching.
//!
//! Everything here is pure: no I/O, no clock, no randomness. Given the same
//! rules and the same context the same winner comes out.
//!
//! A rule matches when every predicate it declares is satisfied (AND across
//! declared predicates, unset predicates are wildcards). Its specificity score
//! is the number of predicates it declared. Among matching confirmed rules the
//! winner is picked by `(score desc, updated_at desc, id asc)`.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::context::TransactionContext;
use crate::domain::rule::Rule;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    Partner,
    PartnerTag,
    Product,
    ProductCategory,
}

impl MatchField {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Partner => "partner",
            Self::PartnerTag => "partner tag",
            Self::Product => "product",
            Self::ProductCategory => "product category",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub rule: Rule,
    pub matched_fields: Vec<MatchField>,
    /// Declared predicates the context did not satisfy. Non-empty means near miss.
    pub unmatched_fields: Vec<MatchField>,
    pub score: usize,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        self.score >= 1 && self.unmatched_fields.is_empty()
    }
}

pub fn evaluate(rule: &Rule, context: &TransactionContext) -> MatchResult {
    let conditions = &rule.conditions;
    let checks = [
        (
            MatchField::Partner,
            conditions
                .partner_id
                .as_ref()
                .map(|expected| context.partner_id.as_ref() == Some(expected)),
        ),
        (
            MatchField::PartnerTag,
            conditions
                .partner_tag_id
                .as_ref()
                .map(|expected| context.partner_tag_ids.contains(expected)),
        ),
        (
            MatchField::Product,
            conditions
                .product_id
                .as_ref()
                .map(|expected| context.product_id.as_ref() == Some(expected)),
        ),
        (
            MatchField::ProductCategory,
            conditions
                .product_category_id
                .as_ref()
                .map(|expected| context.product_category_id.as_ref() == Some(expected)),
        ),
    ];

    let mut matched_fields = Vec::new();
    let mut unmatched_fields = Vec::new();
    for (field, outcome) in checks {
        match outcome {
            Some(true) => matched_fields.push(field),
            Some(false) => unmatched_fields.push(field),
            None => {}
        }
    }

    let score = if unmatched_fields.is_empty() { matched_fields.len() } else { 0 };
    MatchResult { rule: rule.clone(), matched_fields, unmatched_fields, score }
}

/// Precedence between two evaluations; `Less` means `a` wins.
pub fn compare_precedence(a: &MatchResult, b: &MatchResult) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.rule.updated_at.cmp(&a.rule.updated_at))
        .then_with(|| a.rule.id.cmp(&b.rule.id))
}

/// Evaluates every rule and returns the full report, matches first in
/// precedence order, near misses after with the closest first.
pub fn evaluate_all(rules: &[Rule], context: &TransactionContext) -> Vec<MatchResult> {
    let mut evaluations =
        rules.iter().map(|rule| evaluate(rule, context)).collect::<Vec<_>>();
    evaluations.sort_by(|a, b| {
        b.is_match().cmp(&a.is_match()).then_with(|| {
            if a.is_match() {
                return compare_precedence(a, b);
            }
            b.matched_fields
                .len()
                .cmp(&a.matched_fields.len())
                .then_with(|| a.unmatched_fields.len().cmp(&b.unmatched_fields.len()))
                .then_with(|| compare_precedence(a, b))
        })
    });
    evaluations
}

/// Matching confirmed rules in precedence order.
pub fn active_matches(rules: &[Rule], context: &TransactionContext) -> Vec<MatchResult> {
    let mut matches = rules
        .iter()
        .filter(|rule| rule.is_active())
        .map(|rule| evaluate(rule, context))
        .filter(MatchResult::is_match)
        .collect::<Vec<_>>();
    matches.sort_by(compare_precedence);
    matches
}

pub fn select_winner(matches: &[MatchResult]) -> Option<&MatchResult> {
    matches
        .iter()
        .filter(|candidate| candidate.is_match() && candidate.rule.is_active())
        .min_by(|a, b| compare_precedence(a, b))
}

/// Human-readable account of why the winner won.
pub fn explain_winner(winner: &MatchResult, matches: &[MatchResult]) -> String {
    let fields =
        winner.matched_fields.iter().map(MatchField::label).collect::<Vec<_>>().join(" + ");
    let mut explanation = format!(
        "rule \"{}\" matched on {} (score {})",
        winner.rule.name, fields, winner.score
    );

    let rivals = matches
        .iter()
        .filter(|other| other.is_match() && other.rule.id != winner.rule.id)
        .collect::<Vec<_>>();
    let tied = rivals.iter().filter(|other| other.score == winner.score).collect::<Vec<_>>();
    let broader = rivals.iter().filter(|other| other.score < winner.score).count();

    if !tied.is_empty() {
        let same_instant =
            tied.iter().any(|other| other.rule.updated_at == winner.rule.updated_at);
        explanation.push_str(&format!(
            "; {} other rule(s) tied at score {}, the most recently updated rule was chosen",
            tied.len(),
            winner.score
        ));
        if same_instant {
            explanation.push_str(" (equal update times resolved by rule id)");
        }
    }
    if broader > 0 {
        explanation.push_str(&format!("; outranked {broader} less specific rule(s)"));
    }

    explanation
}

/// Active rules captured once for a batch of recommendations.
///
/// Do not hold a snapshot beyond the batch; rules may be confirmed or archived
/// concurrently.
#[derive(Clone, Debug, Default)]
pub struct RuleSnapshot {
    rules: Arc<Vec<Rule>>,
}

impl RuleSnapshot {
    pub fn new(rules: Vec<Rule>) -> Self {
        let rules = rules.into_iter().filter(Rule::is_active).collect::<Vec<_>>();
        Self { rules: Arc::new(rules) }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn matches(&self, context: &TransactionContext) -> Vec<MatchResult> {
        active_matches(&self.rules, context)
    }
}
