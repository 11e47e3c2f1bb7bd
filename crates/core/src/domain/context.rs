use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::partner::{PartnerId, TagId};
use crate::domain::product::{CategoryId, ProductId};

/// Flat snapshot of everything a rule can match on for one transaction line.
///
/// Built fresh for each evaluation; absent references leave the fields empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionContext {
    pub partner_id: Option<PartnerId>,
    pub partner_tag_ids: BTreeSet<TagId>,
    pub product_id: Option<ProductId>,
    pub product_category_id: Option<CategoryId>,
}

impl TransactionContext {
    pub fn is_empty(&self) -> bool {
        self.partner_id.is_none()
            && self.partner_tag_ids.is_empty()
            && self.product_id.is_none()
            && self.product_category_id.is_none()
    }
}

/// A transaction context plus the display names the prompt builder needs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribedContext {
    pub context: TransactionContext,
    pub partner_name: Option<String>,
    pub product_name: Option<String>,
    pub category_name: Option<String>,
}

impl From<TransactionContext> for DescribedContext {
    fn from(context: TransactionContext) -> Self {
        Self { context, ..Self::default() }
    }
}
