//! Resolves partner/product references into a flat matching context.

use std::sync::Arc;

use tracing::warn;

use crate::domain::context::{DescribedContext, TransactionContext};
use crate::domain::partner::PartnerId;
use crate::domain::product::ProductId;
use crate::ports::{LookupError, PartnerLookup, ProductLookup};

#[derive(Clone)]
pub struct ContextBuilder {
    partners: Arc<dyn PartnerLookup>,
    products: Arc<dyn ProductLookup>,
}

impl ContextBuilder {
    pub fn new(partners: Arc<dyn PartnerLookup>, products: Arc<dyn ProductLookup>) -> Self {
        Self { partners, products }
    }

    /// Strict build: a failing lookup propagates, an unknown reference yields
    /// empty fields.
    pub async fn build(
        &self,
        product: Option<&ProductId>,
        partner: Option<&PartnerId>,
    ) -> Result<TransactionContext, LookupError> {
        Ok(self.build_described(product, partner).await?.context)
    }

    pub async fn build_described(
        &self,
        product: Option<&ProductId>,
        partner: Option<&PartnerId>,
    ) -> Result<DescribedContext, LookupError> {
        let mut described = DescribedContext::default();
        self.resolve_partner(&mut described, partner).await?;
        self.resolve_product(&mut described, product).await?;
        Ok(described)
    }

    /// Resolves each side independently; a failing lookup leaves that side
    /// empty so matching can proceed on the partial context.
    pub async fn build_lenient(
        &self,
        product: Option<&ProductId>,
        partner: Option<&PartnerId>,
    ) -> DescribedContext {
        let mut described = DescribedContext::default();

        if let Err(error) = self.resolve_partner(&mut described, partner).await {
            warn!(
                event_name = "context.partner_lookup.failed",
                partner_id = partner.map(|id| id.0.as_str()).unwrap_or("none"),
                error = %error,
                "partner lookup failed; continuing without partner fields"
            );
            described.context.partner_id = None;
            described.context.partner_tag_ids.clear();
            described.partner_name = None;
        }

        if let Err(error) = self.resolve_product(&mut described, product).await {
            warn!(
                event_name = "context.product_lookup.failed",
                product_id = product.map(|id| id.0.as_str()).unwrap_or("none"),
                error = %error,
                "product lookup failed; continuing without product fields"
            );
            described.context.product_id = None;
            described.context.product_category_id = None;
            described.product_name = None;
            described.category_name = None;
        }

        described
    }

    async fn resolve_partner(
        &self,
        described: &mut DescribedContext,
        partner: Option<&PartnerId>,
    ) -> Result<(), LookupError> {
        let Some(partner_id) = partner else {
            return Ok(());
        };

        if let Some(partner) = self.partners.get(partner_id).await? {
            described.context.partner_id = Some(partner.id);
            described.context.partner_tag_ids = partner.tag_ids;
            described.partner_name = Some(partner.name);
        }
        Ok(())
    }

    async fn resolve_product(
        &self,
        described: &mut DescribedContext,
        product: Option<&ProductId>,
    ) -> Result<(), LookupError> {
        let Some(product_id) = product else {
            return Ok(());
        };

        let Some(product) = self.products.get(product_id).await? else {
            return Ok(());
        };

        if let Some(category_id) = &product.category_id {
            described.category_name =
                self.products.category(category_id).await?.map(|category| category.name);
        }
        described.context.product_id = Some(product.id);
        described.context.product_category_id = product.category_id;
        described.product_name = Some(product.name);
        Ok(())
    }
}
