//! In-process port doubles shared by the core unit tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::domain::analytics::{AnalyticsAccount, AnalyticsId};
use crate::domain::history::{HistoricalRecord, TransactionLineId};
use crate::domain::partner::{Partner, PartnerId, TagId};
use crate::domain::product::{CategoryId, Product, ProductCategory, ProductId};
use crate::domain::rule::{Rule, RuleConditions, RuleId, RuleStatus};
use crate::oracle::{ExternalOracle, OracleError};
use crate::ports::{
    AnalyticsCatalog, LookupError, PartnerLookup, ProductLookup, RuleStore, TransactionHistory,
};
use crate::recommend::RecommenderPorts;

pub(crate) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 1, 9, 0, 0).single().expect("valid timestamp")
}

struct HistoryLine {
    partner: String,
    product: String,
    record: HistoricalRecord,
}

/// Azure Interior / Bright Lights furniture world with three confirmed rules.
pub(crate) struct World {
    partners: HashMap<String, Partner>,
    products: HashMap<String, Product>,
    categories: HashMap<String, ProductCategory>,
    accounts: Vec<AnalyticsAccount>,
    lines: Vec<HistoryLine>,
    rules: Mutex<Vec<Rule>>,
    pub(crate) fail_history: bool,
}

impl World {
    pub(crate) fn demo() -> Self {
        let partner = |key: &str, name: &str, tags: &[&str]| {
            (
                key.to_string(),
                Partner {
                    id: PartnerId(key.to_string()),
                    name: name.to_string(),
                    tag_ids: tags.iter().map(|tag| TagId(tag.to_string())).collect::<BTreeSet<_>>(),
                },
            )
        };
        let product = |key: &str, name: &str, category: &str| {
            (
                key.to_string(),
                Product {
                    id: ProductId(key.to_string()),
                    name: name.to_string(),
                    category_id: Some(CategoryId(category.to_string())),
                },
            )
        };
        let category = |key: &str, name: &str| {
            let category =
                ProductCategory { id: CategoryId(key.to_string()), name: name.to_string() };
            (key.to_string(), category)
        };
        let account = |key: &str, name: &str, kind: &str| AnalyticsAccount {
            id: AnalyticsId(key.to_string()),
            name: name.to_string(),
            description: None,
            kind: kind.to_string(),
            archived: false,
        };

        let world = Self {
            partners: HashMap::from([
                partner("azure", "Azure Interior", &["vip"]),
                partner("bright", "Bright Lights", &[]),
                partner("deco", "Deco Addict", &[]),
            ]),
            products: HashMap::from([
                product("desk", "Oak Desk", "wooden-furniture"),
                product("chair", "Oak Chair", "wooden-furniture"),
                product("lamp", "Desk Lamp", "lighting"),
            ]),
            categories: HashMap::from([
                category("wooden-furniture", "Wooden Furniture"),
                category("lighting", "Lighting"),
            ]),
            accounts: vec![
                account("diwali", "Diwali", "event"),
                account("furniture-expo", "Furniture Expo", "event"),
                account("office", "Office", "department"),
            ],
            lines: Vec::new(),
            rules: Mutex::new(Vec::new()),
            fail_history: false,
        };
        world.with_rules(demo_rules())
    }

    pub(crate) fn with_rules(self, rules: Vec<Rule>) -> Self {
        if let Ok(mut guard) = self.rules.lock() {
            *guard = rules;
        }
        self
    }

    pub(crate) fn with_line(
        mut self,
        partner: &str,
        product: &str,
        analytics: &str,
        auto_assigned: bool,
    ) -> Self {
        let n = self.lines.len() + 1;
        let analytics_name = self
            .accounts
            .iter()
            .find(|account| account.id.0 == analytics)
            .map(|account| account.name.clone())
            .unwrap_or_else(|| analytics.to_string());
        let record = HistoricalRecord {
            line_id: TransactionLineId(format!("line-{n}")),
            date: NaiveDate::from_ymd_opt(2024, 9, 1).expect("valid date")
                + ChronoDuration::days(n as i64),
            partner_name: self.partners.get(partner).map(|p| p.name.clone()),
            product_name: self.products.get(product).map(|p| p.name.clone()),
            analytics_id: AnalyticsId(analytics.to_string()),
            analytics_name,
            analytics_kind: "event".to_string(),
            amount: Decimal::new(50_000, 2),
            auto_assigned,
        };
        // most recent first
        self.lines.insert(
            0,
            HistoryLine { partner: partner.to_string(), product: product.to_string(), record },
        );
        self
    }

    pub(crate) fn failing_history(mut self) -> Self {
        self.fail_history = true;
        self
    }

    pub(crate) fn accounts(&self) -> Vec<AnalyticsAccount> {
        self.accounts.clone()
    }

    pub(crate) fn into_ports(self) -> RecommenderPorts {
        let world = Arc::new(self);
        RecommenderPorts {
            partners: world.clone(),
            products: world.clone(),
            rules: world.clone(),
            history: world.clone(),
            catalog: world,
        }
    }
}

pub(crate) fn confirmed_rule(
    key: &str,
    conditions: RuleConditions,
    analytics: &str,
    age_minutes: i64,
) -> Rule {
    let at = epoch() - ChronoDuration::minutes(age_minutes);
    Rule {
        id: RuleId(key.to_string()),
        name: key.to_string(),
        description: None,
        conditions,
        analytics_id: AnalyticsId(analytics.to_string()),
        status: RuleStatus::Confirmed,
        created_at: at,
        updated_at: at,
    }
}

/// R1 partner=Azure -> Diwali, R2 Azure + Wooden Furniture -> Diwali,
/// R3 Wooden Furniture -> Furniture Expo.
pub(crate) fn demo_rules() -> Vec<Rule> {
    vec![
        confirmed_rule(
            "R1",
            RuleConditions {
                partner_id: Some(PartnerId("azure".to_string())),
                ..RuleConditions::default()
            },
            "diwali",
            30,
        ),
        confirmed_rule(
            "R2",
            RuleConditions {
                partner_id: Some(PartnerId("azure".to_string())),
                product_category_id: Some(CategoryId("wooden-furniture".to_string())),
                ..RuleConditions::default()
            },
            "diwali",
            60,
        ),
        confirmed_rule(
            "R3",
            RuleConditions {
                product_category_id: Some(CategoryId("wooden-furniture".to_string())),
                ..RuleConditions::default()
            },
            "furniture-expo",
            10,
        ),
    ]
}

#[async_trait]
impl PartnerLookup for World {
    async fn get(&self, id: &PartnerId) -> Result<Option<Partner>, LookupError> {
        Ok(self.partners.get(&id.0).cloned())
    }
}

#[async_trait]
impl ProductLookup for World {
    async fn get(&self, id: &ProductId) -> Result<Option<Product>, LookupError> {
        Ok(self.products.get(&id.0).cloned())
    }

    async fn category(&self, id: &CategoryId) -> Result<Option<ProductCategory>, LookupError> {
        Ok(self.categories.get(&id.0).cloned())
    }

    async fn list_by_category(&self, id: &CategoryId) -> Result<Vec<ProductId>, LookupError> {
        let mut ids = self
            .products
            .values()
            .filter(|product| product.category_id.as_ref() == Some(id))
            .map(|product| product.id.clone())
            .collect::<Vec<_>>();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl AnalyticsCatalog for World {
    async fn list_available(&self) -> Result<Vec<AnalyticsAccount>, LookupError> {
        Ok(self.accounts.iter().filter(|account| !account.archived).cloned().collect())
    }

    async fn get(&self, id: &AnalyticsId) -> Result<Option<AnalyticsAccount>, LookupError> {
        Ok(self.accounts.iter().find(|account| &account.id == id).cloned())
    }
}

#[async_trait]
impl TransactionHistory for World {
    async fn by_partner(
        &self,
        partner: &PartnerId,
        limit: usize,
    ) -> Result<Vec<HistoricalRecord>, LookupError> {
        if self.fail_history {
            return Err(LookupError::Unavailable("history store offline".to_string()));
        }
        Ok(self
            .lines
            .iter()
            .filter(|line| line.partner == partner.0)
            .map(|line| line.record.clone())
            .take(limit)
            .collect())
    }

    async fn by_products(
        &self,
        products: &[ProductId],
        limit: usize,
    ) -> Result<Vec<HistoricalRecord>, LookupError> {
        if self.fail_history {
            return Err(LookupError::Unavailable("history store offline".to_string()));
        }
        Ok(self
            .lines
            .iter()
            .filter(|line| products.iter().any(|product| product.0 == line.product))
            .map(|line| line.record.clone())
            .take(limit)
            .collect())
    }
}

#[async_trait]
impl RuleStore for World {
    async fn find_active(&self) -> Result<Vec<Rule>, LookupError> {
        self.list(Some(RuleStatus::Confirmed)).await
    }

    async fn find_by_id(&self, id: &RuleId) -> Result<Option<Rule>, LookupError> {
        let rules = self.rules.lock().map_err(|_| poisoned())?;
        Ok(rules.iter().find(|rule| &rule.id == id).cloned())
    }

    async fn list(&self, status: Option<RuleStatus>) -> Result<Vec<Rule>, LookupError> {
        let rules = self.rules.lock().map_err(|_| poisoned())?;
        Ok(rules
            .iter()
            .filter(|rule| status.map_or(true, |wanted| rule.status == wanted))
            .cloned()
            .collect())
    }

    async fn save(&self, rule: Rule) -> Result<(), LookupError> {
        let mut rules = self.rules.lock().map_err(|_| poisoned())?;
        match rules.iter_mut().find(|existing| existing.id == rule.id) {
            Some(existing) => *existing = rule,
            None => rules.push(rule),
        }
        Ok(())
    }

    async fn delete(&self, id: &RuleId) -> Result<bool, LookupError> {
        let mut rules = self.rules.lock().map_err(|_| poisoned())?;
        let before = rules.len();
        rules.retain(|rule| &rule.id != id);
        Ok(rules.len() != before)
    }
}

fn poisoned() -> LookupError {
    LookupError::Unavailable("rule store lock poisoned".to_string())
}

/// Oracle double replying with a fixed text and recording every prompt.
pub(crate) struct ScriptedOracle {
    reply: Result<String, OracleError>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub(crate) fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn failing(error: OracleError) -> Arc<Self> {
        Arc::new(Self { reply: Err(error), delay: None, prompts: Mutex::new(Vec::new()) })
    }

    pub(crate) fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok("[]".to_string()),
            delay: Some(delay),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|prompts| prompts.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ExternalOracle for ScriptedOracle {
    fn provider(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone()
    }
}
