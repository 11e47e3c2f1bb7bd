use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use autotag_core::oracle::{ExternalOracle, OracleError};

use super::TEMPERATURE;
use crate::http::{non_empty, send_json};

pub struct GeminiOracle {
    client: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiOracle {
    pub fn new(client: Client, base_url: String, model: String, api_key: SecretString) -> Self {
        Self { client, base_url, model, api_key }
    }

    fn request<'a>(&self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content { role: "user", parts: vec![Part { text: prompt }] }],
            generation_config: GenerationConfig { temperature: TEMPERATURE },
        }
    }
}

fn reply_text(response: GenerateResponse) -> Result<String, OracleError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();
    non_empty("gemini", text)
}

#[async_trait]
impl ExternalOracle for GeminiOracle {
    fn provider(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let request = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&self.request(prompt));

        reply_text(send_json(request).await?)
    }
}

impl fmt::Debug for GeminiOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiOracle")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Client;
    use secrecy::SecretString;
    use serde_json::json;

    use super::{reply_text, GeminiOracle, GenerateResponse};

    #[test]
    fn request_uses_camel_case_generation_config() {
        let oracle = GeminiOracle::new(
            Client::new(),
            "https://generativelanguage.googleapis.com/v1beta".to_string(),
            "gemini-1.5-flash".to_string(),
            SecretString::from("gm".to_string()),
        );

        let body = serde_json::to_value(oracle.request("hi")).expect("json");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert!(body["generationConfig"]["temperature"].is_number());
    }

    #[test]
    fn extracts_first_candidate_parts() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "[]" }], "role": "model" } }]
        }))
        .expect("decode");

        assert_eq!(reply_text(response).expect("text"), "[]");
    }

    #[test]
    fn blocked_prompt_without_candidates_is_malformed() {
        let response: GenerateResponse =
            serde_json::from_value(json!({ "promptFeedback": { "blockReason": "SAFETY" } }))
                .expect("decode");

        assert!(reply_text(response).is_err());
    }
}
