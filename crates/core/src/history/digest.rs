use std::fmt::Write;

use super::types::{aggregate_usage, AnalyticsUsagePattern, HistoricalDataBundle};

const SECTION_LIMIT: usize = 5;
const OVERALL_LIMIT: usize = 10;

/// Plain-text history digest embedded in the oracle prompt: vendor patterns,
/// this product's own lines, category trends and the overall usage ranking.
pub fn format_for_prompt(bundle: &HistoricalDataBundle) -> String {
    if bundle.is_empty() {
        return "No relevant transaction history is available.".to_string();
    }

    let mut out = String::new();

    if !bundle.partner_history.is_empty() {
        let vendor = bundle
            .partner_history
            .iter()
            .find_map(|record| record.partner_name.as_deref())
            .unwrap_or("this vendor");
        let _ = writeln!(
            out,
            "Vendor patterns for {vendor} ({} lines):",
            bundle.partner_history.len()
        );
        write_patterns(&mut out, &aggregate_usage(&bundle.partner_history));
        out.push('\n');
    }

    if !bundle.product_history.is_empty() {
        let _ = writeln!(
            out,
            "This product's history ({} lines, most recent first):",
            bundle.product_history.len()
        );
        for record in bundle.product_history.iter().take(SECTION_LIMIT) {
            let _ = writeln!(
                out,
                "- {} {} -> {} ({}){}",
                record.date,
                record.partner_name.as_deref().unwrap_or("unknown vendor"),
                record.analytics_name,
                record.amount,
                if record.auto_assigned { " [auto-assigned]" } else { "" }
            );
        }
        out.push('\n');
    }

    if !bundle.category_history.is_empty() {
        let _ = writeln!(
            out,
            "Category trends ({} lines):",
            bundle.category_history.len()
        );
        write_patterns(&mut out, &aggregate_usage(&bundle.category_history));
        out.push('\n');
    }

    let _ = writeln!(out, "Overall usage ranking:");
    for (rank, pattern) in bundle.usage_patterns.iter().take(OVERALL_LIMIT).enumerate() {
        let _ = writeln!(
            out,
            "{}. {} (id: {}): {} uses, {:.0}% auto-assigned",
            rank + 1,
            pattern.analytics_name,
            pattern.analytics_id,
            pattern.count,
            pattern.auto_assigned_rate() * 100.0
        );
    }

    out.trim_end().to_string()
}

fn write_patterns(out: &mut String, patterns: &[AnalyticsUsagePattern]) {
    for pattern in patterns.iter().take(SECTION_LIMIT) {
        let _ = writeln!(
            out,
            "- {}: {} times, total {}, {} auto-assigned",
            pattern.analytics_name, pattern.count, pattern.total_amount, pattern.auto_assigned_count
        );
    }
}
