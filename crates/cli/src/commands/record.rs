use chrono::{NaiveDate, Utc};
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use autotag_core::config::LoadOptions;
use autotag_core::domain::analytics::AnalyticsId;
use autotag_core::domain::history::{DocumentKind, DocumentStatus, TransactionLineId};
use autotag_core::domain::partner::PartnerId;
use autotag_core::domain::product::ProductId;
use autotag_db::NewTransactionLine;

use crate::commands::{execute, CommandResult, Failure, Services, EXIT_PERSISTENCE};

#[derive(Debug, Clone, Args)]
pub struct RecordArgs {
    #[arg(long, default_value = "vendor_bill", help = "purchase_order | vendor_bill")]
    pub kind: String,
    #[arg(long = "ref", help = "Document reference, e.g. BILL/2024/0042")]
    pub document_ref: String,
    #[arg(long, default_value = "posted", help = "draft | confirmed | posted | paid | cancelled")]
    pub status: String,
    #[arg(long, help = "Document date (YYYY-MM-DD), today when omitted")]
    pub date: Option<String>,
    #[arg(long)]
    pub partner: Option<String>,
    #[arg(long)]
    pub product: Option<String>,
    #[arg(long, default_value = "0")]
    pub amount: String,
    #[arg(long, help = "Cost center chosen by hand; skips the rule lookup")]
    pub analytics: Option<String>,
}

#[derive(Debug, Serialize)]
struct RecordedLine {
    line_id: TransactionLineId,
    analytics_id: Option<AnalyticsId>,
    auto_assigned: bool,
    explanation: String,
}

pub fn run(options: &LoadOptions, args: RecordArgs) -> CommandResult {
    execute("record", options, |config| async move {
        let mut line = parse_line(&args)?;
        let services = Services::open(&config).await?;

        let explanation = if line.analytics_id.is_some() {
            "cost center given by hand".to_string()
        } else {
            match services
                .recommender
                .recommend(line.product_id.as_ref(), line.partner_id.as_ref())
                .await
            {
                Ok(result) => {
                    line.auto_assigned = result.analytics_id.is_some();
                    line.analytics_id = result.analytics_id;
                    result.explanation
                }
                Err(error) => {
                    services.close().await;
                    return Err(error.into());
                }
            }
        };

        let stored = services.history.record_line(&line).await;
        services.close().await;
        stored.map_err(|error| Failure::new("persistence", error.to_string(), EXIT_PERSISTENCE))?;

        info!(
            event_name = "record.line.stored",
            line_id = %line.id.0,
            auto_assigned = line.auto_assigned,
            "transaction line recorded"
        );
        let recorded = RecordedLine {
            line_id: line.id,
            analytics_id: line.analytics_id,
            auto_assigned: line.auto_assigned,
            explanation,
        };
        Ok::<_, Failure>(CommandResult::with_data("record", &recorded.explanation, &recorded))
    })
}

fn parse_line(args: &RecordArgs) -> Result<NewTransactionLine, Failure> {
    let document_kind = DocumentKind::parse(&args.kind)
        .ok_or_else(|| Failure::invalid_input(format!("unknown document kind `{}`", args.kind)))?;
    let document_status = DocumentStatus::parse(&args.status).ok_or_else(|| {
        Failure::invalid_input(format!("unknown document status `{}`", args.status))
    })?;
    let document_date = match &args.date {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|error| Failure::invalid_input(format!("invalid date `{raw}`: {error}")))?,
        None => Utc::now().date_naive(),
    };
    let amount = args.amount.parse::<Decimal>().map_err(|error| {
        Failure::invalid_input(format!("invalid amount `{}`: {error}", args.amount))
    })?;
    if args.document_ref.trim().is_empty() {
        return Err(Failure::invalid_input("document reference must not be empty"));
    }

    Ok(NewTransactionLine {
        id: TransactionLineId::generate(),
        document_kind,
        document_ref: args.document_ref.trim().to_string(),
        document_status,
        document_date,
        partner_id: args.partner.clone().map(PartnerId),
        product_id: args.product.clone().map(ProductId),
        analytics_id: args.analytics.clone().map(AnalyticsId),
        amount,
        auto_assigned: false,
        recorded_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use autotag_core::domain::history::{DocumentKind, DocumentStatus};

    use super::{parse_line, RecordArgs};

    fn args() -> RecordArgs {
        RecordArgs {
            kind: "purchase_order".to_string(),
            document_ref: "PO/2024/0100".to_string(),
            status: "confirmed".to_string(),
            date: Some("2024-10-02".to_string()),
            partner: Some("partner-azure".to_string()),
            product: Some("prod-oak-desk".to_string()),
            amount: "1250.50".to_string(),
            analytics: None,
        }
    }

    #[test]
    fn parses_document_fields() {
        let line = parse_line(&args()).expect("valid");

        assert_eq!(line.document_kind, DocumentKind::PurchaseOrder);
        assert_eq!(line.document_status, DocumentStatus::Confirmed);
        assert_eq!(line.amount.to_string(), "1250.50");
        assert!(!line.auto_assigned);
    }

    #[test]
    fn rejects_unknown_status_and_bad_date() {
        let mut bad_status = args();
        bad_status.status = "archived".to_string();
        assert_eq!(parse_line(&bad_status).expect_err("status").class, "invalid_input");

        let mut bad_date = args();
        bad_date.date = Some("02/10/2024".to_string());
        assert!(parse_line(&bad_date).is_err());
    }
}
