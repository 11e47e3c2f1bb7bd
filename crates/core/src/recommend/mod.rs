//! Recommendation orchestration.
//!
//! The deterministic path (`recommend`) applies the winning confirmed rule and,
//! when nothing matches, may attach an advisory AI suggestion. The
//! history-aware path (`recommend_with_history`) always computes statistical
//! suggestions and consults the oracle when it is enabled. Everything after
//! "no rule matched" degrades instead of failing.

mod orchestrator;
mod parse;
mod prompt;
mod types;

pub use orchestrator::{RecommenderPorts, Recommender, NO_RULES_MATCHED};
pub use parse::{extract_json_array, parse_reply, ParsedReply, MAX_AI_SUGGESTIONS};
pub use prompt::render_prompt;
pub use types::*;
