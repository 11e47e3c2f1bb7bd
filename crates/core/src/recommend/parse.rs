//! Defensive parsing of oracle replies.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use serde_json::{Deserializer, Value};

use crate::domain::analytics::{AnalyticsAccount, AnalyticsId};
use crate::domain::recommendation::{Recommendation, RecommendationSource};
use crate::oracle::OracleError;

/// Upper bound on the ranked array the oracle is asked for and may return.
pub const MAX_AI_SUGGESTIONS: usize = 3;

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedReply {
    pub recommendations: Vec<Recommendation>,
    /// Items dropped for an unknown id, a missing reason or a non-numeric confidence.
    pub discarded: usize,
}

/// Returns the first well-formed JSON array embedded anywhere in `reply`.
pub fn extract_json_array(reply: &str) -> Option<Vec<Value>> {
    reply.char_indices().filter(|(_, ch)| *ch == '[').find_map(|(start, _)| {
        let mut stream = Deserializer::from_str(&reply[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Array(items))) => Some(items),
            _ => None,
        }
    })
}

/// Parses a reply into validated AI recommendations. Ids outside `available`
/// are discarded, never corrected. Names always come from the catalog. At
/// most `min(max_results, MAX_AI_SUGGESTIONS)` items are kept.
pub fn parse_reply(
    reply: &str,
    available: &[AnalyticsAccount],
    max_results: usize,
) -> Result<ParsedReply, OracleError> {
    let items = extract_json_array(reply)
        .ok_or_else(|| OracleError::Malformed("reply contains no JSON array".to_string()))?;

    let catalog: HashMap<&str, &AnalyticsAccount> =
        available.iter().map(|account| (account.id.0.as_str(), account)).collect();

    let mut seen = BTreeSet::new();
    let mut discarded = 0;
    let mut recommendations = Vec::new();
    for item in &items {
        match validate_item(item, &catalog) {
            Some(recommendation) => {
                if seen.insert(recommendation.analytics_id.clone()) {
                    recommendations.push(recommendation);
                }
            }
            None => discarded += 1,
        }
    }

    recommendations.sort_by(|left, right| {
        right.confidence.partial_cmp(&left.confidence).unwrap_or(Ordering::Equal)
    });
    recommendations.truncate(max_results.min(MAX_AI_SUGGESTIONS));

    Ok(ParsedReply { recommendations, discarded })
}

fn validate_item(
    item: &Value,
    catalog: &HashMap<&str, &AnalyticsAccount>,
) -> Option<Recommendation> {
    let object = item.as_object()?;
    let id = object
        .get("analyticsId")
        .or_else(|| object.get("analytics_id"))
        .and_then(Value::as_str)
        .map(str::trim)?;
    let account = catalog.get(id)?;

    let confidence = object.get("confidence").and_then(Value::as_f64)?;
    if !confidence.is_finite() {
        return None;
    }
    let reason = object
        .get("reason")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|reason| !reason.is_empty())?;

    Some(Recommendation {
        analytics_id: AnalyticsId(account.id.0.clone()),
        analytics_name: account.name.clone(),
        confidence: confidence.clamp(0.0, 1.0),
        reason: reason.to_string(),
        source: RecommendationSource::Ai,
    })
}

#[cfg(test)]
mod tests {
    use super::{extract_json_array, parse_reply};
    use crate::domain::analytics::{AnalyticsAccount, AnalyticsId};
    use crate::domain::recommendation::RecommendationSource;
    use crate::oracle::OracleError;

    fn available() -> Vec<AnalyticsAccount> {
        ["diwali", "furniture-expo", "office"]
            .into_iter()
            .map(|id| AnalyticsAccount {
                id: AnalyticsId(id.to_string()),
                name: format!("Catalog {id}"),
                description: None,
                kind: "event".to_string(),
                archived: false,
            })
            .collect()
    }

    #[test]
    fn finds_array_inside_prose_and_code_fences() {
        let reply =
            "Sure! Here you go:\n```json\n[{\"analyticsId\": \"diwali\"}]\n```\nHope it helps [1].";
        let items = extract_json_array(reply).expect("array found");
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn skips_brackets_that_are_not_json() {
        let reply = "[draft] thinking... [{\"analyticsId\": \"office\"}]";
        let items = extract_json_array(reply).expect("second bracket parses");
        assert_eq!(items[0]["analyticsId"], "office");
    }

    #[test]
    fn keeps_at_most_three_even_when_more_are_allowed() {
        let reply = r#"[
            {"analyticsId": "office", "confidence": 0.2, "reason": "supplies"},
            {"analyticsId": "diwali", "confidence": 0.9, "reason": "festival"},
            {"analyticsId": "furniture-expo", "confidence": 0.6, "reason": "trade fair"},
            {"analyticsId": "summer", "confidence": 0.5, "reason": "season"}
        ]"#;
        let mut catalog = available();
        catalog.push(AnalyticsAccount {
            id: AnalyticsId("summer".to_string()),
            name: "Summer".to_string(),
            description: None,
            kind: "event".to_string(),
            archived: false,
        });

        let parsed = parse_reply(reply, &catalog, 10).expect("valid reply");

        let ids = parsed
            .recommendations
            .iter()
            .map(|recommendation| recommendation.analytics_id.0.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["diwali", "furniture-expo", "summer"]);
        assert_eq!(parsed.discarded, 0);
    }

    #[test]
    fn reply_without_array_is_malformed() {
        let result = parse_reply("I cannot help with that.", &available(), 3);
        assert!(matches!(result, Err(OracleError::Malformed(_))));
    }

    #[test]
    fn unknown_ids_are_discarded_not_corrected() {
        let reply = r#"[
            {"analyticsId": "diwal", "analyticsName": "Diwali", "confidence": 0.9,
             "reason": "typo"},
            {"analyticsId": "office", "analyticsName": "Office", "confidence": 0.4,
             "reason": "generic supplies"}
        ]"#;

        let parsed = parse_reply(reply, &available(), 3).expect("parses");
        assert_eq!(parsed.discarded, 1);
        assert_eq!(parsed.recommendations.len(), 1);
        assert_eq!(parsed.recommendations[0].analytics_id, AnalyticsId("office".to_string()));
    }

    #[test]
    fn names_come_from_catalog_and_confidence_is_clamped() {
        let reply = r#"[{"analyticsId": "diwali", "analyticsName": "Made Up",
            "confidence": 1.7, "reason": "festival vendor"}]"#;

        let parsed = parse_reply(reply, &available(), 3).expect("parses");
        let item = &parsed.recommendations[0];
        assert_eq!(item.analytics_name, "Catalog diwali");
        assert_eq!(item.confidence, 1.0);
        assert_eq!(item.source, RecommendationSource::Ai);
    }

    #[test]
    fn items_without_reason_or_numeric_confidence_are_dropped() {
        let reply = r#"[
            {"analyticsId": "diwali", "confidence": "high", "reason": "x"},
            {"analyticsId": "office", "confidence": 0.5, "reason": "  "},
            {"analyticsId": "furniture-expo", "confidence": 0.6, "reason": "trade fair stock"}
        ]"#;

        let parsed = parse_reply(reply, &available(), 3).expect("parses");
        assert_eq!(parsed.discarded, 2);
        assert_eq!(parsed.recommendations.len(), 1);
    }

    #[test]
    fn output_is_ranked_deduplicated_and_capped() {
        let reply = r#"[
            {"analyticsId": "office", "confidence": 0.2, "reason": "a"},
            {"analyticsId": "diwali", "confidence": 0.8, "reason": "b"},
            {"analyticsId": "diwali", "confidence": 0.7, "reason": "duplicate"},
            {"analyticsId": "furniture-expo", "confidence": 0.5, "reason": "c"}
        ]"#;

        let parsed = parse_reply(reply, &available(), 2).expect("parses");
        let ids = parsed
            .recommendations
            .iter()
            .map(|item| item.analytics_id.0.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["diwali", "furniture-expo"]);
    }

    #[test]
    fn empty_array_is_a_valid_answer() {
        let parsed = parse_reply("[]", &available(), 3).expect("parses");
        assert!(parsed.recommendations.is_empty());
        assert_eq!(parsed.discarded, 0);
    }
}
