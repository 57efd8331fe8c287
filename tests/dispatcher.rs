use mentor::backend::{Dispatcher, LocalBackend, ModelPreferences};
use mentor::config::{BackendKind, Config};
use mentor::prompt::RequestKind;
use std::time::Duration;

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_unreachable_local_backend_reports_connection_failure() {
    let backend = LocalBackend::new(
        format!("http://127.0.0.1:{}", closed_port()),
        256,
        Duration::from_secs(5),
    );
    let dispatcher = Dispatcher::new(
        Box::new(backend),
        ModelPreferences::defaults(),
        Some("llama3.2".to_string()),
    );

    assert!(dispatcher.refresh_models().await.is_err());

    let response = dispatcher
        .dispatch("Explain Delta Lake time travel", RequestKind::ConceptExplanation, None)
        .await;
    assert_eq!(response.text, "");
    assert_eq!(response.error.as_deref(), Some("connection failed"));
    assert_eq!(response.model_used, "llama3.2");
}

#[tokio::test]
async fn test_hosted_backend_without_key_reports_auth_failure() {
    let config = Config {
        backend: Some(BackendKind::Hosted),
        hosted_endpoint: Some(format!("http://127.0.0.1:{}", closed_port())),
        ..Default::default()
    };
    assert!(config.validate().is_err());

    let dispatcher = Dispatcher::from_config(&config);
    assert_eq!(dispatcher.backend_name(), "hosted");
    dispatcher.refresh_models().await.unwrap();

    let response = dispatcher
        .dispatch("Review this", RequestKind::CodeReview, None)
        .await;
    assert_eq!(response.error.as_deref(), Some("authentication failed"));
    assert_eq!(response.model_used, mentor::config::DEFAULT_HOSTED_MODEL);
}

#[tokio::test]
async fn test_default_local_config_tries_the_endpoint() {
    let config = Config {
        backend: Some(BackendKind::Local),
        local_endpoint: Some(format!("http://127.0.0.1:{}", closed_port())),
        ..Default::default()
    };
    assert!(config.validate().is_ok());

    let dispatcher = Dispatcher::from_config(&config);
    assert_eq!(dispatcher.backend_name(), "local");
    assert!(dispatcher.refresh_models().await.is_err());

    let response = dispatcher
        .dispatch("Explain Airflow", RequestKind::ConceptExplanation, None)
        .await;
    assert_eq!(response.text, "");
    assert_eq!(response.error.as_deref(), Some("connection failed"));
    assert_eq!(response.model_used, mentor::config::DEFAULT_LOCAL_MODEL);
}
