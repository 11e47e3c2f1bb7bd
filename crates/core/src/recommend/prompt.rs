use serde::Serialize;
use tera::{Context, Tera};

use crate::domain::analytics::AnalyticsAccount;
use crate::domain::context::DescribedContext;
use crate::history::{format_for_prompt, HistoricalDataBundle};
use crate::oracle::OracleError;
use crate::recommend::parse::MAX_AI_SUGGESTIONS;

const SUGGESTION_TEMPLATE: &str =
    include_str!("../../../../templates/prompts/suggest_cost_center.txt.tera");

const NOT_SPECIFIED: &str = "not specified";

#[derive(Serialize)]
struct PromptAccount<'a> {
    id: &'a str,
    name: &'a str,
    kind: &'a str,
    description: Option<&'a str>,
}

/// Renders the provider-agnostic suggestion prompt. The requested array size
/// never exceeds [`MAX_AI_SUGGESTIONS`].
pub fn render_prompt(
    described: &DescribedContext,
    available: &[AnalyticsAccount],
    history: &HistoricalDataBundle,
    max_results: usize,
) -> Result<String, OracleError> {
    let accounts = available
        .iter()
        .map(|account| PromptAccount {
            id: &account.id.0,
            name: &account.name,
            kind: &account.kind,
            description: account.description.as_deref().filter(|text| !text.trim().is_empty()),
        })
        .collect::<Vec<_>>();

    let mut context = Context::new();
    context.insert("partner_name", described.partner_name.as_deref().unwrap_or(NOT_SPECIFIED));
    context.insert("product_name", described.product_name.as_deref().unwrap_or(NOT_SPECIFIED));
    context.insert("category_name", described.category_name.as_deref().unwrap_or(NOT_SPECIFIED));
    context.insert("analytics", &accounts);
    context.insert("history", &format_for_prompt(history));
    context.insert("max_results", &max_results.min(MAX_AI_SUGGESTIONS));

    Tera::one_off(SUGGESTION_TEMPLATE, &context, false)
        .map_err(|error| OracleError::Prompt(error.to_string()))
}
