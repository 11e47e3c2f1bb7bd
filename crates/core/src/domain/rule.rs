use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::analytics::AnalyticsId;
use crate::domain::partner::{PartnerId, TagId};
use crate::domain::product::{CategoryId, ProductId};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuleId(pub String);

impl RuleId {
    pub fn generate() -> Self {
        Self(format!("rule-{}", Uuid::new_v4()))
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    Draft,
    Confirmed,
    Archived,
}

impl RuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Confirmed => "confirmed",
            Self::Archived => "archived",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "confirmed" => Some(Self::Confirmed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// The four optional match predicates. An unset predicate is a wildcard.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConditions {
    pub partner_id: Option<PartnerId>,
    pub partner_tag_id: Option<TagId>,
    pub product_id: Option<ProductId>,
    pub product_category_id: Option<CategoryId>,
}

impl RuleConditions {
    pub fn declared_count(&self) -> usize {
        [
            self.partner_id.is_some(),
            self.partner_tag_id.is_some(),
            self.product_id.is_some(),
            self.product_category_id.is_some(),
        ]
        .into_iter()
        .filter(|declared| *declared)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.declared_count() == 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub name: String,
    pub description: Option<String>,
    pub conditions: RuleConditions,
    pub analytics_id: AnalyticsId,
    pub status: RuleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rule {
    /// Builds a draft rule, rejecting one without any predicate.
    pub fn draft(
        name: impl Into<String>,
        description: Option<String>,
        conditions: RuleConditions,
        analytics_id: AnalyticsId,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::InvariantViolation("rule name must not be empty".to_owned()));
        }
        if conditions.is_empty() {
            return Err(DomainError::RuleWithoutConditions);
        }

        Ok(Self {
            id: RuleId::generate(),
            name,
            description,
            conditions,
            analytics_id,
            status: RuleStatus::Draft,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == RuleStatus::Confirmed
    }

    pub fn is_editable(&self) -> bool {
        self.status == RuleStatus::Draft
    }

    pub fn can_transition_to(&self, next: RuleStatus) -> bool {
        matches!(
            (self.status, next),
            (RuleStatus::Draft, RuleStatus::Confirmed)
                | (RuleStatus::Confirmed, RuleStatus::Archived)
        )
    }

    pub fn transition_to(
        &mut self,
        next: RuleStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.can_transition_to(next) {
            return Err(DomainError::InvalidRuleTransition { from: self.status, to: next });
        }
        if next == RuleStatus::Confirmed && self.conditions.is_empty() {
            return Err(DomainError::RuleWithoutConditions);
        }

        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{Rule, RuleConditions, RuleStatus};
    use crate::domain::analytics::AnalyticsId;
    use crate::domain::partner::PartnerId;
    use crate::errors::DomainError;

    fn partner_rule() -> Rule {
        Rule::draft(
            "Azure purchases",
            None,
            RuleConditions {
                partner_id: Some(PartnerId("azure".to_string())),
                ..RuleConditions::default()
            },
            AnalyticsId("diwali".to_string()),
            Utc::now(),
        )
        .expect("valid draft")
    }

    #[test]
    fn rejects_rule_without_any_condition() {
        let error = Rule::draft(
            "Catch all",
            None,
            RuleConditions::default(),
            AnalyticsId("diwali".to_string()),
            Utc::now(),
        )
        .expect_err("empty conditions should be rejected");

        assert_eq!(error, DomainError::RuleWithoutConditions);
    }

    #[test]
    fn draft_confirms_then_archives() {
        let mut rule = partner_rule();
        assert_eq!(rule.status, RuleStatus::Draft);

        rule.transition_to(RuleStatus::Confirmed, Utc::now()).expect("draft -> confirmed");
        assert!(rule.is_active());
        assert!(!rule.is_editable());

        rule.transition_to(RuleStatus::Archived, Utc::now()).expect("confirmed -> archived");
        assert!(!rule.is_active());
    }

    #[test]
    fn archived_rule_cannot_be_revived() {
        let mut rule = partner_rule();
        rule.transition_to(RuleStatus::Confirmed, Utc::now()).expect("confirm");
        rule.transition_to(RuleStatus::Archived, Utc::now()).expect("archive");

        let error =
            rule.transition_to(RuleStatus::Confirmed, Utc::now()).expect_err("no way back");
        assert!(matches!(error, DomainError::InvalidRuleTransition { .. }));
    }

    #[test]
    fn draft_cannot_skip_to_archived() {
        let rule = partner_rule();
        assert!(!rule.can_transition_to(RuleStatus::Archived));
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(RuleStatus::parse(" Confirmed "), Some(RuleStatus::Confirmed));
        assert_eq!(RuleStatus::parse("retired"), None);
    }
}
