use std::fmt;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use autotag_core::oracle::{ExternalOracle, OracleError};

use super::TEMPERATURE;
use crate::http::{non_empty, send_json};

/// Any endpoint speaking the OpenAI chat-completions dialect.
pub struct OpenAiOracle {
    client: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiOracle {
    pub fn new(client: Client, base_url: String, model: String, api_key: SecretString) -> Self {
        Self { client, base_url, model, api_key }
    }

    fn request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: TEMPERATURE,
        }
    }
}

fn reply_text(response: ChatResponse) -> Result<String, OracleError> {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();
    non_empty("openai", text)
}

#[async_trait]
impl ExternalOracle for OpenAiOracle {
    fn provider(&self) -> &str {
        "openai"
    }

    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key.expose_secret()))
            .json(&self.request(prompt));

        reply_text(send_json(request).await?)
    }
}

impl fmt::Debug for OpenAiOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiOracle")
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

    use super::{reply_text, ChatResponse, OpenAiOracle};

    fn oracle() -> OpenAiOracle {
        OpenAiOracle::new(
            Client::new(),
            "https://api.openai.com/v1".to_string(),
            "gpt-4o-mini".to_string(),
            SecretString::from("sk-secret".to_string()),
        )
    }

    #[test]
    fn request_carries_model_and_single_user_turn() {
        let oracle = oracle();
        let body = serde_json::to_value(oracle.request("pick a cost center")).expect("json");

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "pick a cost center");
    }

    #[test]
    fn extracts_first_choice_content() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "role": "assistant", "content": " [] " } }]
        }))
        .expect("decode");

        assert_eq!(reply_text(response).expect("text"), "[]");
    }

    #[test]
    fn missing_choices_are_malformed() {
        let response: ChatResponse =
            serde_json::from_value(json!({ "choices": [] })).expect("decode");
        assert!(reply_text(response).is_err());
    }

    #[test]
    fn debug_output_redacts_the_key() {
        let rendered = format!("{:?}", oracle());
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("sk-secret"));
    }
}
