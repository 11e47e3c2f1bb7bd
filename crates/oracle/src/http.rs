use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use autotag_core::oracle::OracleError;

use crate::OracleBuildError;

const ERROR_BODY_LIMIT: usize = 512;

pub(crate) fn client(timeout: Duration) -> Result<Client, OracleBuildError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("autotag/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|error| OracleBuildError::Client(error.to_string()))
}

/// Sends the request and decodes a JSON success body. Non-2xx statuses keep a
/// truncated copy of the response body for the logs.
pub(crate) async fn send_json<R: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<R, OracleError> {
    let response =
        request.send().await.map_err(|error| OracleError::Transport(error.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(OracleError::Status { status: status.as_u16(), body: truncate(&body) });
    }

    response.json::<R>().await.map_err(|error| OracleError::Malformed(error.to_string()))
}

/// Rejects a reply with no text so parsing downstream sees a clear cause.
pub(crate) fn non_empty(provider: &str, text: String) -> Result<String, OracleError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(OracleError::Malformed(format!("{provider} returned no text")));
    }
    Ok(trimmed.to_string())
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
