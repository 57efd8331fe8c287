//! Model selection and single-attempt dispatch.

use super::{Backend, BackendError, BackendResponse};
use crate::config::Config;
use crate::prompt::RequestKind;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Name patterns of code-specialized local models
pub const DEFAULT_CODE_MODEL_PATTERNS: [&str; 2] = ["deepseek-coder", "codellama"];

/// Per-kind ordered list of preferred model name patterns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelPreferences {
    table: BTreeMap<RequestKind, Vec<String>>,
}

impl ModelPreferences {
    /// Code review prefers code-specialized models; other kinds use the default
    pub fn defaults() -> Self {
        let mut prefs = Self::default();
        prefs.set(
            RequestKind::CodeReview,
            DEFAULT_CODE_MODEL_PATTERNS.iter().map(|p| p.to_string()).collect(),
        );
        prefs
    }

    /// Build from configuration: defaults, then the configured table, then
    /// `preferred_code_model` ahead of everything for code review
    pub fn from_config(config: &Config) -> Self {
        let mut prefs = Self::defaults();

        if let Some(table) = &config.model_preferences {
            for (kind, patterns) in table {
                match kind.parse::<RequestKind>() {
                    Ok(kind) => prefs.set(kind, patterns.clone()),
                    Err(_) => {
                        tracing::warn!("Ignoring model preference for unknown kind '{}'", kind)
                    }
                }
            }
        }

        if let Some(model) = config.preferred_code_model.as_deref() {
            prefs.prefer(RequestKind::CodeReview, model);
        }

        prefs
    }

    pub fn set(&mut self, kind: RequestKind, patterns: Vec<String>) {
        self.table.insert(kind, patterns);
    }

    /// Put `pattern` first for `kind`
    pub fn prefer(&mut self, kind: RequestKind, pattern: &str) {
        let patterns = self.table.entry(kind).or_default();
        patterns.retain(|p| p != pattern);
        patterns.insert(0, pattern.to_string());
    }

    pub fn patterns(&self, kind: RequestKind) -> &[String] {
        self.table.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First available model matching a preference, exact names before substrings
    pub fn pick<'a>(&self, kind: RequestKind, available: &'a [String]) -> Option<&'a str> {
        for pattern in self.patterns(kind) {
            if let Some(exact) = available.iter().find(|m| *m == pattern) {
                return Some(exact);
            }
            if let Some(partial) = available.iter().find(|m| m.contains(pattern.as_str())) {
                return Some(partial);
            }
        }
        None
    }
}

/// Sends prompts to the configured backend
pub struct Dispatcher {
    backend: Box<dyn Backend>,
    preferences: ModelPreferences,
    default_model: Option<String>,
    fallback_model: Option<String>,
    available: RwLock<Vec<String>>,
}

impl Dispatcher {
    pub fn new(
        backend: Box<dyn Backend>,
        preferences: ModelPreferences,
        default_model: Option<String>,
    ) -> Self {
        Self {
            backend,
            preferences,
            default_model: default_model.filter(|m| !m.trim().is_empty()),
            fallback_model: None,
            available: RwLock::new(Vec::new()),
        }
    }

    /// Model to try when nothing is configured and the backend lists nothing
    pub fn with_fallback_model(mut self, model: Option<String>) -> Self {
        self.fallback_model = model.filter(|m| !m.trim().is_empty());
        self
    }

    /// Backend chosen by `config.backend`, selected once here
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            super::from_config(config),
            ModelPreferences::from_config(config),
            config.model(),
        )
        .with_fallback_model(config.fallback_model())
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    pub fn preferences(&self) -> &ModelPreferences {
        &self.preferences
    }

    /// Models seen on the last successful refresh
    pub async fn available_models(&self) -> Vec<String> {
        self.available.read().await.clone()
    }

    /// Re-query the backend's model list; on failure the list is cleared
    pub async fn refresh_models(&self) -> Result<usize, BackendError> {
        let result = self.backend.list_models().await;
        let mut available = self.available.write().await;
        match result {
            Ok(models) => {
                tracing::info!(
                    "Backend '{}' exposes {} model(s)",
                    self.backend.name(),
                    models.len()
                );
                *available = models;
                Ok(available.len())
            }
            Err(e) => {
                tracing::warn!("Could not list models on '{}': {}", self.backend.name(), e);
                available.clear();
                Err(e)
            }
        }
    }

    /// Model for `kind`: a preferred model the backend exposes, else the
    /// session override, else the configured default, else the first model
    /// the backend lists, else the backend's fallback
    pub async fn select_model(
        &self,
        kind: RequestKind,
        model_override: Option<&str>,
    ) -> Option<String> {
        let available = self.available.read().await;

        if let Some(preferred) = self.preferences.pick(kind, &available) {
            return Some(preferred.to_string());
        }

        model_override
            .filter(|m| !m.trim().is_empty())
            .map(str::to_string)
            .or_else(|| self.default_model.clone())
            .or_else(|| available.first().cloned())
            .or_else(|| self.fallback_model.clone())
    }

    /// Send one prompt; failures come back inside the response, never as `Err`
    pub async fn dispatch(
        &self,
        prompt: &str,
        kind: RequestKind,
        model_override: Option<&str>,
    ) -> BackendResponse {
        let Some(model) = self.select_model(kind, model_override).await else {
            tracing::warn!("No model available for {}", kind);
            return BackendResponse::failed(&BackendError::NoModel, "");
        };

        tracing::debug!(
            "Dispatching {} ({} chars) to {}:{}",
            kind,
            prompt.len(),
            self.backend.name(),
            model
        );

        match self.backend.send(prompt, &model).await {
            Ok(text) => {
                tracing::info!("{} answered by {} ({} chars)", kind, model, text.len());
                BackendResponse::ok(text, model)
            }
            Err(e) => {
                tracing::warn!("{} failed on {}: {}", kind, model, e);
                BackendResponse::failed(&e, model)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_default_preferences_only_cover_code_review() {
        let prefs = ModelPreferences::defaults();
        assert_eq!(prefs.patterns(RequestKind::CodeReview).len(), 2);
        assert!(prefs.patterns(RequestKind::InterviewPrep).is_empty());
    }

    #[test]
    fn test_pick_prefers_pattern_order() {
        let prefs = ModelPreferences::defaults();
        let available = models(&["llama3.2:latest", "codellama:7b", "deepseek-coder:6.7b"]);
        assert_eq!(
            prefs.pick(RequestKind::CodeReview, &available),
            Some("deepseek-coder:6.7b")
        );
        assert_eq!(prefs.pick(RequestKind::ConceptExplanation, &available), None);
    }

    #[test]
    fn test_pick_exact_before_substring() {
        let mut prefs = ModelPreferences::default();
        prefs.set(RequestKind::PracticeScenario, models(&["mistral"]));
        let available = models(&["mistral-large", "mistral"]);
        assert_eq!(
            prefs.pick(RequestKind::PracticeScenario, &available),
            Some("mistral")
        );
    }

    #[test]
    fn test_prefer_moves_pattern_to_front() {
        let mut prefs = ModelPreferences::defaults();
        prefs.prefer(RequestKind::CodeReview, "codellama");
        assert_eq!(
            prefs.patterns(RequestKind::CodeReview),
            &models(&["codellama", "deepseek-coder"])[..]
        );
    }

    #[test]
    fn test_from_config_applies_table_and_code_model() {
        let mut table = std::collections::HashMap::new();
        table.insert("interview_prep".to_string(), models(&["llama3.1:70b"]));
        table.insert("bogus".to_string(), models(&["x"]));
        let config = Config {
            model_preferences: Some(table),
            preferred_code_model: Some("qwen2.5-coder".to_string()),
            ..Default::default()
        };

        let prefs = ModelPreferences::from_config(&config);
        assert_eq!(prefs.patterns(RequestKind::InterviewPrep), &models(&["llama3.1:70b"])[..]);
        assert_eq!(prefs.patterns(RequestKind::CodeReview)[0], "qwen2.5-coder");
    }

    struct FakeBackend {
        models: Result<Vec<String>, BackendError>,
        reply: Result<String, BackendError>,
        sent: std::sync::Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn new(models: &[&str], reply: Result<String, BackendError>) -> Self {
            Self {
                models: Ok(self::models(models)),
                reply,
                sent: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl Backend for std::sync::Arc<FakeBackend> {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn send(&self, _prompt: &str, model: &str) -> Result<String, BackendError> {
            self.sent.lock().unwrap().push(model.to_string());
            self.reply.clone()
        }

        async fn list_models(&self) -> Result<Vec<String>, BackendError> {
            self.models.clone()
        }
    }

    async fn dispatcher(
        fake: &std::sync::Arc<FakeBackend>,
        default_model: Option<&str>,
    ) -> Dispatcher {
        let d = Dispatcher::new(
            Box::new(fake.clone()),
            ModelPreferences::defaults(),
            default_model.map(str::to_string),
        );
        let _ = d.refresh_models().await;
        d
    }

    #[tokio::test]
    async fn test_code_review_uses_code_model() {
        let fake = std::sync::Arc::new(FakeBackend::new(
            &["llama3.2:latest", "codellama:7b"],
            Ok("looks good".to_string()),
        ));
        let d = dispatcher(&fake, Some("llama3.2:latest")).await;

        let resp = d
            .dispatch("review this", RequestKind::CodeReview, Some("mistral"))
            .await;
        assert_eq!(resp, BackendResponse::ok("looks good", "codellama:7b"));

        let resp = d
            .dispatch("explain", RequestKind::ConceptExplanation, Some("mistral"))
            .await;
        assert_eq!(resp.model_used, "mistral");

        let resp = d
            .dispatch("explain", RequestKind::ConceptExplanation, None)
            .await;
        assert_eq!(resp.model_used, "llama3.2:latest");
        assert_eq!(fake.sent.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_falls_back_to_first_listed_model() {
        let fake = std::sync::Arc::new(FakeBackend::new(&["phi3"], Ok("ok".to_string())));
        let d = dispatcher(&fake, None).await;
        assert_eq!(
            d.select_model(RequestKind::CodeReview, None).await.as_deref(),
            Some("phi3")
        );
    }

    #[tokio::test]
    async fn test_no_model_is_reported_not_raised() {
        let fake = std::sync::Arc::new(FakeBackend::new(&[], Ok("unused".to_string())));
        let d = dispatcher(&fake, None).await;

        let resp = d.dispatch("hi", RequestKind::InterviewPrep, None).await;
        assert_eq!(resp.text, "");
        assert_eq!(resp.error.as_deref(), Some("no model selected"));
        assert!(fake.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_is_single_attempt() {
        let fake = std::sync::Arc::new(FakeBackend::new(&["llama3.2"], Err(BackendError::Quota)));
        let d = dispatcher(&fake, None).await;

        let resp = d.dispatch("hi", RequestKind::PracticeScenario, None).await;
        assert_eq!(resp.error.as_deref(), Some("quota exceeded"));
        assert_eq!(resp.model_used, "llama3.2");
        assert_eq!(fake.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_models() {
        let mut fake = FakeBackend::new(&["llama3.2"], Ok(String::new()));
        fake.models = Err(BackendError::Connection);
        let fake = std::sync::Arc::new(fake);
        let d = dispatcher(&fake, Some("llama3.2")).await;

        assert!(d.available_models().await.is_empty());
        assert_eq!(d.refresh_models().await, Err(BackendError::Connection));
        assert_eq!(
            d.select_model(RequestKind::CodeReview, None).await.as_deref(),
            Some("llama3.2")
        );
    }

    #[tokio::test]
    async fn test_fallback_model_only_when_nothing_else() {
        let fake = std::sync::Arc::new(FakeBackend::new(&[], Ok("ok".to_string())));
        let d = Dispatcher::new(Box::new(fake.clone()), ModelPreferences::defaults(), None)
            .with_fallback_model(Some("llama3.2".to_string()));
        let _ = d.refresh_models().await;

        assert_eq!(
            d.select_model(RequestKind::PracticeScenario, Some("mistral")).await.as_deref(),
            Some("mistral")
        );
        let resp = d.dispatch("hi", RequestKind::PracticeScenario, None).await;
        assert_eq!(resp.model_used, "llama3.2");
        assert!(resp.is_ok());
        assert_eq!(
            d.select_model(RequestKind::CodeReview, None).await.as_deref(),
            Some("llama3.2")
        );
    }
}
