use std::collections::HashMap;

use tokio::sync::RwLock;

use autotag_core::domain::analytics::{AnalyticsAccount, AnalyticsId};
use autotag_core::domain::rule::{Rule, RuleId, RuleStatus};
use autotag_core::ports::{AnalyticsCatalog, LookupError, RuleStore};

#[derive(Default)]
pub struct InMemoryRuleRepository {
    rules: RwLock<HashMap<String, Rule>>,
}

#[async_trait::async_trait]
impl RuleStore for InMemoryRuleRepository {
    async fn find_active(&self) -> Result<Vec<Rule>, LookupError> {
        self.list(Some(RuleStatus::Confirmed)).await
    }

    async fn find_by_id(&self, id: &RuleId) -> Result<Option<Rule>, LookupError> {
        let rules = self.rules.read().await;
        Ok(rules.get(&id.0).cloned())
    }

    async fn list(&self, status: Option<RuleStatus>) -> Result<Vec<Rule>, LookupError> {
        let rules = self.rules.read().await;
        let mut listed: Vec<Rule> = rules
            .values()
            .filter(|rule| status.map_or(true, |status| rule.status == status))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(listed)
    }

    async fn save(&self, rule: Rule) -> Result<(), LookupError> {
        let mut rules = self.rules.write().await;
        rules.insert(rule.id.0.clone(), rule);
        Ok(())
    }

    async fn delete(&self, id: &RuleId) -> Result<bool, LookupError> {
        let mut rules = self.rules.write().await;
        Ok(rules.remove(&id.0).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryAnalyticsCatalog {
    accounts: RwLock<HashMap<String, AnalyticsAccount>>,
}

impl InMemoryAnalyticsCatalog {
    pub async fn insert(&self, account: AnalyticsAccount) {
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.id.0.clone(), account);
    }
}

#[async_trait::async_trait]
impl AnalyticsCatalog for InMemoryAnalyticsCatalog {
    async fn list_available(&self) -> Result<Vec<AnalyticsAccount>, LookupError> {
        let accounts = self.accounts.read().await;
        let mut available: Vec<AnalyticsAccount> =
            accounts.values().filter(|account| !account.archived).cloned().collect();
        available.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(available)
    }

    async fn get(&self, id: &AnalyticsId) -> Result<Option<AnalyticsAccount>, LookupError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id.0).cloned())
    }
}
