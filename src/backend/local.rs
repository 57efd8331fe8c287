//! Local backend: an Ollama-compatible model server on a loopback endpoint.

use super::{http_client, Backend, BackendError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const TEMPERATURE: f64 = 0.7;
const TOP_P: f64 = 0.9;

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Client for a local model server
pub struct LocalBackend {
    client: reqwest::Client,
    endpoint: String,
    max_tokens: u64,
}

impl LocalBackend {
    pub fn new(endpoint: String, max_tokens: u64, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            endpoint,
            max_tokens,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.trim_end_matches('/'), path)
    }

    async fn get_body(&self, response: reqwest::Response) -> Result<String, BackendError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::from_transport(&e))?;
        if !status.is_success() {
            return Err(BackendError::from_status(status.as_u16(), &body));
        }
        Ok(body)
    }
}

fn parse_generate(body: &str) -> Result<String, BackendError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Malformed(e.to_string()))?;

    if let Some(err) = parsed.error {
        return Err(BackendError::Malformed(err));
    }
    parsed
        .response
        .ok_or_else(|| BackendError::Malformed("missing 'response' field".to_string()))
}

fn parse_tags(body: &str) -> Result<Vec<String>, BackendError> {
    let parsed: TagsResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Malformed(e.to_string()))?;
    Ok(parsed.models.into_iter().map(|m| m.name).collect())
}

#[async_trait]
impl Backend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn send(&self, prompt: &str, model: &str) -> Result<String, BackendError> {
        let request_body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": TEMPERATURE,
                "top_p": TOP_P,
                "num_predict": self.max_tokens,
            },
        });

        let response = self
            .client
            .post(self.url("/api/generate"))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!("Local request to {} failed: {}", self.endpoint, e);
                BackendError::from_transport(&e)
            })?;

        let body = self.get_body(response).await?;
        parse_generate(&body)
    }

    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| BackendError::from_transport(&e))?;

        let body = self.get_body(response).await?;
        parse_tags(&body)
    }
}
