use clap::Args;

use autotag_core::config::LoadOptions;
use autotag_core::domain::partner::PartnerId;
use autotag_core::domain::product::ProductId;
use autotag_core::LineRef;

use crate::commands::{execute, CommandResult, Failure, Services};

#[derive(Debug, Clone, Default, Args)]
pub struct RecommendArgs {
    #[arg(long, help = "Product id on the line")]
    pub product: Option<String>,
    #[arg(long, help = "Partner (vendor) id on the line")]
    pub partner: Option<String>,
    #[arg(
        long = "line",
        value_name = "PRODUCT@PARTNER",
        help = "Batch mode: one line per flag, either side may be empty"
    )]
    pub lines: Vec<String>,
}

pub fn run(options: &LoadOptions, args: RecommendArgs) -> CommandResult {
    execute("recommend", options, |config| async move {
        let batch = args
            .lines
            .iter()
            .map(|raw| parse_line(raw))
            .collect::<Result<Vec<_>, _>>()?;
        if !batch.is_empty() && (args.product.is_some() || args.partner.is_some()) {
            return Err(Failure::invalid_input("use either --line or --product/--partner"));
        }

        let services = Services::open(&config).await?;

        let outcome = if batch.is_empty() {
            let product = args.product.map(ProductId);
            let partner = args.partner.map(PartnerId);
            services
                .recommender
                .recommend(product.as_ref(), partner.as_ref())
                .await
                .map(|result| CommandResult::with_data("recommend", &result.explanation, &result))
        } else {
            services.recommender.recommend_batch(batch).await.map(|results| {
                let assigned =
                    results.iter().filter(|result| result.analytics_id.is_some()).count();
                CommandResult::with_data(
                    "recommend",
                    format!("{} line(s) evaluated, {assigned} assigned by rule", results.len()),
                    &results,
                )
            })
        };

        services.close().await;
        Ok::<_, Failure>(outcome?)
    })
}

/// `PRODUCT@PARTNER`; a bare value is a product, `@PARTNER` a partner only.
pub fn parse_line(raw: &str) -> Result<LineRef, Failure> {
    let (product, partner) = raw.split_once('@').unwrap_or((raw, ""));
    let product = product.trim();
    let partner = partner.trim();
    if product.is_empty() && partner.is_empty() {
        return Err(Failure::invalid_input(format!(
            "line `{raw}` names neither product nor partner"
        )));
    }

    Ok(LineRef {
        product_id: (!product.is_empty()).then(|| ProductId(product.to_string())),
        partner_id: (!partner.is_empty()).then(|| PartnerId(partner.to_string())),
    })
}

#[cfg(test)]
mod tests {
    use autotag_core::domain::partner::PartnerId;
    use autotag_core::domain::product::ProductId;

    use super::parse_line;

    #[test]
    fn parses_product_and_partner() {
        let line = parse_line("prod-oak-desk@partner-azure").expect("valid");
        assert_eq!(line.product_id, Some(ProductId("prod-oak-desk".to_string())));
        assert_eq!(line.partner_id, Some(PartnerId("partner-azure".to_string())));
    }

    #[test]
    fn either_side_may_be_omitted() {
        assert!(parse_line("prod-paper").expect("product only").partner_id.is_none());
        assert!(parse_line("@partner-deco").expect("partner only").product_id.is_none());
    }

    #[test]
    fn empty_line_is_invalid_input() {
        let failure = parse_line(" @ ").expect_err("nothing to match");
        assert_eq!(failure.class, "invalid_input");
    }
}
