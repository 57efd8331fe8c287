//! HTTP server hosting the learner page and the JSON API.

mod routes;

use crate::session::SessionContext;
use crate::tutor::Tutor;
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
pub struct AppState {
    pub tutor: Arc<Tutor>,
    pub session: RwLock<SessionContext>,
    /// Setup problem found at startup, reported instead of dispatching
    pub config_error: Option<String>,
    /// Outcome of the last model refresh, shown as a setup hint
    pub backend_error: RwLock<Option<String>>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(tutor: Tutor, session: SessionContext) -> Self {
        Self {
            tutor: Arc::new(tutor),
            session: RwLock::new(session),
            config_error: None,
            backend_error: RwLock::new(None),
            start_time: Instant::now(),
        }
    }

    pub fn with_config_error(mut self, error: Option<String>) -> Self {
        self.config_error = error;
        self
    }

    pub fn with_backend_error(mut self, error: Option<String>) -> Self {
        self.backend_error = RwLock::new(error);
        self
    }
}

/// Build the router over shared state
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::page_routes())
        .merge(routes::curriculum_routes())
        .merge(routes::progress_routes())
        .merge(routes::tutor_routes())
        .merge(routes::backend_routes())
        .merge(routes::session_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until interrupted
pub async fn run(state: AppState, host: &str, port: u16) -> Result<()> {
    let app = router(Arc::new(state));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
        .context("Server error")?;
    Ok(())
}
