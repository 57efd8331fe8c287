//! Configuration management module.
//!
//! Configuration is layered, later sources overriding earlier ones:
//! - Global config file (~/.config/mentor/mentor.json)
//! - Project config file (./mentor.jsonc or ./mentor.json, searched upward)
//! - Environment variables
//!
//! Files may contain comments, trailing commas and `{env:VAR}` references.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::fs;

pub const DEFAULT_HOSTED_ENDPOINT: &str = "https://api.anthropic.com";
pub const DEFAULT_HOSTED_MODEL: &str = "claude-3-sonnet-20240229";
pub const DEFAULT_LOCAL_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_LOCAL_MODEL: &str = "llama3.2";
pub const DEFAULT_MAX_TOKENS: u64 = 2000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8501;

const CONFIG_FILES: [&str; 2] = ["mentor.jsonc", "mentor.json"];

/// Which text-generation service answers requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Hosted,
    Local,
}

impl std::str::FromStr for BackendKind {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hosted" | "anthropic" | "claude" => Ok(BackendKind::Hosted),
            "local" | "ollama" => Ok(BackendKind::Local),
            other => Err(crate::error::Error::configuration(format!(
                "unknown backend '{}' (expected 'hosted' or 'local')",
                other
            ))),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Hosted => write!(f, "hosted"),
            BackendKind::Local => write!(f, "local"),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Backend kind; when unset, hosted if an API key is present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendKind>,

    /// Key for the hosted API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosted_endpoint: Option<String>,

    /// Models offered on the hosted backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosted_models: Option<Vec<String>>,

    /// Base URL of the local model server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_endpoint: Option<String>,

    /// Default model name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Model tried first for code review
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_code_model: Option<String>,

    /// Request kind -> ordered model name patterns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_preferences: Option<HashMap<String, Vec<String>>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// Learner name, used for the progress file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learner: Option<String>,

    /// Directory holding progress files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// JSON file replacing the built-in curriculum
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curriculum: Option<PathBuf>,

    /// Log level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// HTTP server settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Config {
    /// Load configuration from all sources
    pub async fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(global_path) = Self::global_config_path() {
            if let Some(global_config) = Self::load_file(&global_path).await? {
                config = config.merge(global_config);
            }
        }

        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        if let Some(project_path) = Self::find_project_config(&cwd) {
            tracing::debug!("Using project config {:?}", project_path);
            if let Some(project_config) = Self::load_file(&project_path).await? {
                config = config.merge(project_config);
            }
        }

        Ok(config.apply_env_overrides())
    }

    /// Get the global config directory path
    pub fn global_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mentor"))
    }

    /// Get the global config file path
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|p| p.join("mentor.json"))
    }

    /// Find a project config file in `start` or its parents
    pub fn find_project_config(start: &Path) -> Option<PathBuf> {
        start.ancestors().find_map(|dir| {
            CONFIG_FILES
                .iter()
                .map(|name| dir.join(name))
                .find(|path| path.is_file())
        })
    }

    /// Load configuration from a file
    pub async fn load_file(path: &Path) -> Result<Option<Config>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
            .map(Some)
    }

    /// Parse JSONC text into a config
    pub fn parse(content: &str) -> Result<Config> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }

        let content = Self::strip_jsonc_comments(content);
        let content = Self::strip_trailing_commas(&content);
        let content = Self::substitute_env_vars(&content);

        Ok(serde_json::from_str(&content)?)
    }

    /// Strip comments from JSONC content
    fn strip_jsonc_comments(content: &str) -> String {
        let mut result = String::with_capacity(content.len());
        let mut in_string = false;
        let mut escaped = false;
        let mut in_line_comment = false;
        let mut in_block_comment = false;
        let mut chars = content.chars().peekable();

        while let Some(c) = chars.next() {
            if in_line_comment {
                if c == '\n' {
                    in_line_comment = false;
                    result.push(c);
                }
                continue;
            }

            if in_block_comment {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    in_block_comment = false;
                }
                continue;
            }

            if in_string {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    in_string = false;
                }
                result.push(c);
                continue;
            }

            match (c, chars.peek()) {
                ('"', _) => in_string = true,
                ('/', Some('/')) => {
                    chars.next();
                    in_line_comment = true;
                    continue;
                }
                ('/', Some('*')) => {
                    chars.next();
                    in_block_comment = true;
                    continue;
                }
                _ => {}
            }

            result.push(c);
        }

        result
    }

    /// Strip trailing commas before closing braces or brackets
    fn strip_trailing_commas(content: &str) -> String {
        static RE: OnceLock<regex::Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            regex::Regex::new(r",(\s*[}\]])").expect("valid trailing comma regex")
        });
        re.replace_all(content, "$1").to_string()
    }

    /// Substitute environment variables in the format {env:VAR_NAME}
    fn substitute_env_vars(content: &str) -> String {
        static RE: OnceLock<regex::Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            regex::Regex::new(r"\{env:([^}]+)\}").expect("valid env reference regex")
        });
        re.replace_all(content, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .to_string()
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(mut self, other: Config) -> Self {
        if other.backend.is_some() {
            self.backend = other.backend;
        }
        if other.api_key.is_some() {
            self.api_key = other.api_key;
        }
        if other.hosted_endpoint.is_some() {
            self.hosted_endpoint = other.hosted_endpoint;
        }
        if other.hosted_models.is_some() {
            self.hosted_models = other.hosted_models;
        }
        if other.local_endpoint.is_some() {
            self.local_endpoint = other.local_endpoint;
        }
        if other.model.is_some() {
            self.model = other.model;
        }
        if other.preferred_code_model.is_some() {
            self.preferred_code_model = other.preferred_code_model;
        }
        if other.max_tokens.is_some() {
            self.max_tokens = other.max_tokens;
        }
        if other.request_timeout_secs.is_some() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
        if other.learner.is_some() {
            self.learner = other.learner;
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.curriculum.is_some() {
            self.curriculum = other.curriculum;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }

        if let Some(other_prefs) = other.model_preferences {
            let prefs = self.model_preferences.get_or_insert_with(HashMap::new);
            prefs.extend(other_prefs);
        }

        if let Some(other_server) = other.server {
            let server = self.server.get_or_insert_with(ServerConfig::default);
            if other_server.host.is_some() {
                server.host = other_server.host;
            }
            if other_server.port.is_some() {
                server.port = other_server.port;
            }
        }

        self
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    fn apply_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = var("ANTHROPIC_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(backend) = var("MENTOR_BACKEND") {
            match backend.parse() {
                Ok(kind) => self.backend = Some(kind),
                Err(e) => tracing::warn!("Ignoring MENTOR_BACKEND: {}", e),
            }
        }
        if let Some(endpoint) = var("MENTOR_LOCAL_ENDPOINT") {
            self.local_endpoint = Some(endpoint);
        }
        if let Some(model) = var("MENTOR_MODEL") {
            self.model = Some(model);
        }
        if let Some(model) = var("MENTOR_CODE_MODEL") {
            self.preferred_code_model = Some(model);
        }
        if let Some(dir) = var("MENTOR_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = var("MENTOR_LOG_LEVEL") {
            self.log_level = Some(level);
        }
        self
    }

    fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.unwrap_or(if self.has_api_key() {
            BackendKind::Hosted
        } else {
            BackendKind::Local
        })
    }

    pub fn hosted_endpoint(&self) -> String {
        self.hosted_endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_HOSTED_ENDPOINT.to_string())
    }

    pub fn local_endpoint(&self) -> String {
        self.local_endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_LOCAL_ENDPOINT.to_string())
    }

    /// Default model, falling back to the stock hosted model on the hosted backend
    pub fn model(&self) -> Option<String> {
        self.model.clone().or_else(|| match self.backend_kind() {
            BackendKind::Hosted => Some(DEFAULT_HOSTED_MODEL.to_string()),
            BackendKind::Local => None,
        })
    }

    /// Model tried when nothing else is configured or listed
    pub fn fallback_model(&self) -> Option<String> {
        match self.backend_kind() {
            BackendKind::Hosted => None,
            BackendKind::Local => Some(DEFAULT_LOCAL_MODEL.to_string()),
        }
    }

    /// Hosted model list: configured models plus the default and code models
    pub fn hosted_models(&self) -> Vec<String> {
        let mut models: Vec<String> = Vec::new();
        let candidates = self
            .hosted_models
            .iter()
            .flatten()
            .cloned()
            .chain(self.model())
            .chain(self.preferred_code_model.clone());
        for model in candidates {
            if !model.trim().is_empty() && !models.contains(&model) {
                models.push(model);
            }
        }
        models
    }

    pub fn max_tokens(&self) -> u64 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
    }

    /// Learner name: configured, else the login name, else "learner"
    pub fn learner(&self) -> String {
        self.learner
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .or_else(|| std::env::var("USERNAME").ok())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "learner".to_string())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|p| p.join("mentor"))
                .unwrap_or_else(|| PathBuf::from(".mentor"))
        })
    }

    pub fn host(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
    }

    pub fn port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_PORT)
    }

    /// Check that the selected backend can be reached in principle
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;

        match self.backend_kind() {
            BackendKind::Hosted if !self.has_api_key() => Err(Error::configuration(
                "hosted backend selected but no API key is set (set ANTHROPIC_API_KEY or `api_key`)",
            )),
            BackendKind::Hosted => Ok(()),
            BackendKind::Local => {
                let endpoint = self.local_endpoint();
                match reqwest::Url::parse(&endpoint) {
                    Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
                    _ => Err(Error::configuration(format!(
                        "invalid local endpoint URL '{}'",
                        endpoint
                    ))),
                }
            }
        }
    }
}
