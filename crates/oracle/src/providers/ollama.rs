use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use autotag_core::oracle::{ExternalOracle, OracleError};

use super::TEMPERATURE;
use crate::http::{non_empty, send_json};

/// Local model served by Ollama. No credentials.
#[derive(Debug)]
pub struct OllamaOracle {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaOracle {
    pub fn new(client: Client, base_url: String, model: String) -> Self {
        Self { client, base_url, model }
    }

    fn request<'a>(&'a self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: TEMPERATURE },
        }
    }
}

#[async_trait]
impl ExternalOracle for OllamaOracle {
    fn provider(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let request = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&self.request(prompt));

        let response: GenerateResponse = send_json(request).await?;
        non_empty("ollama", response.response)
    }
}
