use clap::Args;

use autotag_core::config::LoadOptions;
use autotag_core::domain::partner::PartnerId;
use autotag_core::domain::product::ProductId;

use crate::commands::{execute, CommandResult, Failure, Services};

#[derive(Debug, Clone, Default, Args)]
pub struct ExplainArgs {
    #[arg(long, help = "Product id on the line")]
    pub product: Option<String>,
    #[arg(long, help = "Partner (vendor) id on the line")]
    pub partner: Option<String>,
    #[arg(long, help = "Also evaluate draft rules (they are reported but never win)")]
    pub include_drafts: bool,
}

pub fn run(options: &LoadOptions, args: ExplainArgs) -> CommandResult {
    execute("explain", options, |config| async move {
        let services = Services::open(&config).await?;
        let product = args.product.map(ProductId);
        let partner = args.partner.map(PartnerId);

        let outcome = services
            .recommender
            .explain_rules(product.as_ref(), partner.as_ref(), args.include_drafts)
            .await;
        services.close().await;

        let report = outcome?;
        Ok::<_, Failure>(CommandResult::with_data("explain", &report.explanation, &report))
    })
}
