//! Text-generation backends.
//!
//! Both the hosted API and a local model server sit behind the [`Backend`]
//! trait: send a prompt to a named model, get text back. The [`Dispatcher`]
//! chooses the model for each request kind and turns every failure into a
//! [`BackendResponse`] with `error` set.

mod dispatcher;
mod hosted;
mod local;

pub use dispatcher::*;
pub use hosted::HostedBackend;
pub use local::LocalBackend;

use crate::config::{BackendKind, Config};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failure talking to a backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("connection failed")]
    Connection,
    #[error("request timed out")]
    Timeout,
    #[error("authentication failed")]
    Auth,
    #[error("quota exceeded")]
    Quota,
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("no model selected")]
    NoModel,
}

impl BackendError {
    /// Classify a transport error from reqwest
    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_decode() {
            BackendError::Malformed(err.to_string())
        } else {
            BackendError::Connection
        }
    }

    /// Classify a non-success HTTP status
    pub(crate) fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => BackendError::Auth,
            429 => BackendError::Quota,
            _ => BackendError::Status {
                status,
                body: truncate_body(body),
            },
        }
    }

    /// What the learner should fix when `backend` fails this way
    pub fn setup_hint(&self, backend: &str) -> String {
        let fix = match self {
            BackendError::Connection | BackendError::Timeout if backend == "local" => {
                "start the local model server or set MENTOR_LOCAL_ENDPOINT"
            }
            BackendError::Connection | BackendError::Timeout => "check the network connection",
            BackendError::Auth => "set ANTHROPIC_API_KEY or `api_key`",
            BackendError::Quota => "wait for the quota to reset",
            BackendError::NoModel => "set `model` in mentor.json",
            BackendError::Status { .. } | BackendError::Malformed(_) => {
                "check the endpoint points at a compatible server"
            }
        };
        format!("{} backend: {}; {}", backend, self, fix)
    }
}

const MAX_ERROR_BODY: usize = 300;

fn truncate_body(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Result of one dispatch, successful or not
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendResponse {
    pub text: String,
    pub model_used: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BackendResponse {
    pub fn ok(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model_used: model.into(),
            error: None,
        }
    }

    pub fn failed(err: &BackendError, model: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            model_used: model.into(),
            error: Some(err.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// A prompt-in, text-out generation service
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short identifier for logs and status output
    fn name(&self) -> &'static str;

    /// Generate a completion for `prompt` with `model`
    async fn send(&self, prompt: &str, model: &str) -> Result<String, BackendError>;

    /// Models this backend can serve
    async fn list_models(&self) -> Result<Vec<String>, BackendError>;
}

/// Shared HTTP client with the configured request timeout
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to build HTTP client with timeout: {}", e);
            reqwest::Client::new()
        })
}

/// Build the backend named by the configuration
pub fn from_config(config: &Config) -> Box<dyn Backend> {
    let timeout = Duration::from_secs(config.request_timeout_secs());
    match config.backend_kind() {
        BackendKind::Hosted => Box::new(HostedBackend::new(
            config.api_key.clone().unwrap_or_default(),
            config.hosted_endpoint(),
            config.hosted_models(),
            config.max_tokens(),
            timeout,
        )),
        BackendKind::Local => Box::new(LocalBackend::new(
            config.local_endpoint(),
            config.max_tokens(),
            timeout,
        )),
    }
}
