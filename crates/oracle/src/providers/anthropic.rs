use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use autotag_core::oracle::{ExternalOracle, OracleError};

use super::TEMPERATURE;
use crate::http::{non_empty, send_json};

const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

pub struct AnthropicOracle {
    client: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

impl AnthropicOracle {
    pub fn new(client: Client, base_url: String, model: String, api_key: SecretString) -> Self {
        Self { client, base_url, model, api_key }
    }

    fn request<'a>(&'a self, prompt: &'a str) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            messages: vec![Message { role: "user", content: prompt }],
        }
    }
}

fn reply_text(response: MessagesResponse) -> Result<String, OracleError> {
    let text: String = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();
    non_empty("anthropic", text)
}

#[async_trait]
impl ExternalOracle for AnthropicOracle {
    fn provider(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let request = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&self.request(prompt));

        reply_text(send_json(request).await?)
    }
}

impl fmt::Debug for AnthropicOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicOracle")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
