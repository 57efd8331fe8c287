//! Hosted backend: the Anthropic Messages API, non-streaming.

use super::{http_client, Backend, BackendError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Client for a hosted, API-key authenticated model service
pub struct HostedBackend {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    models: Vec<String>,
    max_tokens: u64,
}

impl HostedBackend {
    pub fn new(
        api_key: String,
        endpoint: String,
        models: Vec<String>,
        max_tokens: u64,
        timeout: Duration,
    ) -> Self {
        Self {
            client: http_client(timeout),
            api_key,
            endpoint,
            models,
            max_tokens,
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.endpoint.trim_end_matches('/'))
    }
}

/// Concatenate the text blocks of a messages response
fn extract_text(body: &str) -> Result<String, BackendError> {
    let parsed: MessagesResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Malformed(e.to_string()))?;

    let text: String = parsed
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();

    if text.is_empty() {
        return Err(BackendError::Malformed(
            "response contained no text content".to_string(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl Backend for HostedBackend {
    fn name(&self) -> &'static str {
        "hosted"
    }

    async fn send(&self, prompt: &str, model: &str) -> Result<String, BackendError> {
        if self.api_key.is_empty() {
            return Err(BackendError::Auth);
        }

        let request_body = serde_json::json!({
            "model": model,
            "max_tokens": self.max_tokens,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!("Hosted request failed: {}", e);
                BackendError::from_transport(&e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::from_transport(&e))?;

        if !status.is_success() {
            return Err(BackendError::from_status(status.as_u16(), &body));
        }

        extract_text(&body)
    }

    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.models.clone())
    }
}
