//! Rule lifecycle: draft -> confirmed -> archived, with the validation that
//! keeps malformed rules away from the matching engine.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::analytics::AnalyticsId;
use crate::domain::rule::{Rule, RuleConditions, RuleId, RuleStatus};
use crate::errors::{ApplicationError, DomainError};
use crate::ports::{AnalyticsCatalog, RuleStore};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRule {
    pub name: String,
    pub description: Option<String>,
    pub conditions: RuleConditions,
    pub analytics_id: AnalyticsId,
}

/// Partial edit of a draft. `None` keeps the current value; the conditions are
/// replaced as a whole when given.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub conditions: Option<RuleConditions>,
    pub analytics_id: Option<AnalyticsId>,
}

#[derive(Clone)]
pub struct RuleService {
    store: Arc<dyn RuleStore>,
    catalog: Arc<dyn AnalyticsCatalog>,
}

impl RuleService {
    pub fn new(store: Arc<dyn RuleStore>, catalog: Arc<dyn AnalyticsCatalog>) -> Self {
        Self { store, catalog }
    }

    pub async fn create(&self, new_rule: NewRule) -> Result<Rule, ApplicationError> {
        self.ensure_analytics(&new_rule.analytics_id).await?;
        let rule = Rule::draft(
            new_rule.name,
            new_rule.description,
            new_rule.conditions,
            new_rule.analytics_id,
            Utc::now(),
        )?;
        self.store.save(rule.clone()).await?;

        info!(
            event_name = "rules.lifecycle.created",
            rule_id = %rule.id,
            analytics_id = %rule.analytics_id,
            predicates = rule.conditions.declared_count(),
            "rule drafted"
        );
        Ok(rule)
    }

    pub async fn update(&self, id: &RuleId, update: RuleUpdate) -> Result<Rule, ApplicationError> {
        let mut rule = self.load(id).await?;
        if !rule.is_editable() {
            return Err(DomainError::RuleNotEditable { status: rule.status }.into());
        }

        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(
                    DomainError::InvariantViolation("rule name must not be empty".to_owned()).into()
                );
            }
            rule.name = name;
        }
        if let Some(description) = update.description {
            rule.description = description;
        }
        if let Some(conditions) = update.conditions {
            if conditions.is_empty() {
                return Err(DomainError::RuleWithoutConditions.into());
            }
            rule.conditions = conditions;
        }
        if let Some(analytics_id) = update.analytics_id {
            self.ensure_analytics(&analytics_id).await?;
            rule.analytics_id = analytics_id;
        }
        rule.updated_at = Utc::now();

        self.store.save(rule.clone()).await?;
        info!(event_name = "rules.lifecycle.updated", rule_id = %rule.id, "draft rule updated");
        Ok(rule)
    }

    /// Makes a draft live. The target cost center is checked again because it
    /// may have been archived since the draft was written.
    pub async fn confirm(&self, id: &RuleId) -> Result<Rule, ApplicationError> {
        let rule = self.load(id).await?;
        self.ensure_analytics(&rule.analytics_id).await?;
        self.transition(rule, RuleStatus::Confirmed).await
    }

    pub async fn archive(&self, id: &RuleId) -> Result<Rule, ApplicationError> {
        let rule = self.load(id).await?;
        self.transition(rule, RuleStatus::Archived).await
    }

    /// Hard delete, permitted only while the rule is a draft.
    pub async fn delete(&self, id: &RuleId) -> Result<(), ApplicationError> {
        let rule = self.load(id).await?;
        if !rule.is_editable() {
            return Err(DomainError::RuleNotEditable { status: rule.status }.into());
        }
        if !self.store.delete(id).await? {
            return Err(DomainError::RuleNotFound(id.clone()).into());
        }

        info!(event_name = "rules.lifecycle.deleted", rule_id = %id, "draft rule deleted");
        Ok(())
    }

    pub async fn get(&self, id: &RuleId) -> Result<Rule, ApplicationError> {
        self.load(id).await
    }

    pub async fn list(&self, status: Option<RuleStatus>) -> Result<Vec<Rule>, ApplicationError> {
        Ok(self.store.list(status).await?)
    }

    pub async fn find_active(&self) -> Result<Vec<Rule>, ApplicationError> {
        Ok(self.store.find_active().await?)
    }

    async fn transition(&self, mut rule: Rule, next: RuleStatus) -> Result<Rule, ApplicationError> {
        let from = rule.status;
        rule.transition_to(next, Utc::now())?;
        self.store.save(rule.clone()).await?;

        info!(
            event_name = "rules.lifecycle.transition",
            rule_id = %rule.id,
            from = from.as_str(),
            to = next.as_str(),
            "rule status changed"
        );
        Ok(rule)
    }

    async fn load(&self, id: &RuleId) -> Result<Rule, ApplicationError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::RuleNotFound(id.clone()).into())
    }

    async fn ensure_analytics(&self, id: &AnalyticsId) -> Result<(), ApplicationError> {
        match self.catalog.get(id).await? {
            Some(account) if !account.archived => Ok(()),
            _ => Err(DomainError::UnknownAnalytics(id.clone()).into()),
        }
    }
}
