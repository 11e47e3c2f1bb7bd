use clap::Args;

use autotag_core::config::LoadOptions;
use autotag_core::domain::partner::PartnerId;
use autotag_core::domain::product::ProductId;
use autotag_core::RichRecommendationResult;

use crate::commands::{execute, CommandResult, Failure, Services};

#[derive(Debug, Clone, Default, Args)]
pub struct SuggestArgs {
    #[arg(long, help = "Product id on the line")]
    pub product: Option<String>,
    #[arg(long, help = "Partner (vendor) id on the line")]
    pub partner: Option<String>,
}

pub fn run(options: &LoadOptions, args: SuggestArgs) -> CommandResult {
    execute("suggest", options, |config| async move {
        let services = Services::open(&config).await?;
        let product = args.product.map(ProductId);
        let partner = args.partner.map(PartnerId);

        let outcome = services.recommender.suggest(product.as_ref(), partner.as_ref()).await;
        services.close().await;

        let result = outcome?;
        Ok::<_, Failure>(CommandResult::with_data("suggest", summary(&result), &result))
    })
}

fn summary(result: &RichRecommendationResult) -> String {
    let mut summary = format!(
        "{} AI suggestion(s), {} statistical suggestion(s)",
        result.recommendations.len(),
        result.statistical_recommendations.len()
    );
    if let Some(error) = &result.error {
        summary.push_str(&format!("; AI unavailable: {error}"));
    }
    summary
}

#[cfg(test)]
mod tests {
    use autotag_core::RichRecommendationResult;

    use super::summary;

    #[test]
    fn summary_names_the_oracle_problem() {
        let result = RichRecommendationResult {
            recommendations: Vec::new(),
            statistical_recommendations: Vec::new(),
            used: false,
            provider: None,
            error: Some("AI recommendations are disabled".to_string()),
            duration_ms: 3,
            history: Default::default(),
        };

        assert_eq!(
            summary(&result),
            "0 AI suggestion(s), 0 statistical suggestion(s); \
             AI unavailable: AI recommendations are disabled"
        );
    }
}
