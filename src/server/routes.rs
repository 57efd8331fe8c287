//! API routes.

use super::AppState;
use crate::backend::BackendResponse;
use crate::curriculum::CurriculumWeek;
use crate::dashboard::Dashboard;
use crate::error::Error;
use crate::progress::{ProgressEntry, ProgressRecord, WeekFilter};
use crate::prompt::{Request, RequestDetails, RequestKind};
use crate::session::{SessionContext, SessionUpdate};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

type AppStateArc = Arc<AppState>;
type ApiResult<T> = Result<T, (StatusCode, String)>;

const INDEX_HTML: &str = include_str!("index.html");

/// Map a library error onto an HTTP status
fn reject(err: Error) -> (StatusCode, String) {
    let status = match &err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Storage(_) | Error::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    }
    (status, err.to_string())
}

/// Unwrap a JSON body, answering malformed bodies like any other invalid request
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| reject(Error::validation(rejection.body_text())))
}

// Page and health

pub fn page_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

// Curriculum

pub fn curriculum_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/curriculum", get(list_weeks))
        .route("/api/curriculum/{week}", get(get_week))
}

async fn list_weeks(State(state): State<AppStateArc>) -> Json<Vec<CurriculumWeek>> {
    Json(state.tutor.curriculum().weeks().to_vec())
}

async fn get_week(
    State(state): State<AppStateArc>,
    Path(week): Path<u32>,
) -> ApiResult<Json<CurriculumWeek>> {
    state
        .tutor
        .curriculum()
        .get_week(week)
        .cloned()
        .map(Json)
        .map_err(reject)
}

// Progress and dashboard

pub fn progress_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/progress", get(list_progress).post(log_progress))
        .route("/api/dashboard", get(dashboard))
}

#[derive(Debug, Default, Deserialize)]
struct ProgressQuery {
    week: Option<u32>,
    day: Option<u32>,
    /// Only the latest record per topic
    #[serde(default)]
    current: bool,
}

async fn list_progress(
    State(state): State<AppStateArc>,
    Query(query): Query<ProgressQuery>,
) -> ApiResult<Json<Vec<ProgressRecord>>> {
    let filter = match (query.week, query.day) {
        (Some(week), day) => Some(WeekFilter { week, day }),
        (None, Some(_)) => {
            return Err(reject(Error::validation("day filter requires a week")));
        }
        (None, None) => None,
    };

    let store = state.tutor.store();
    let records = if query.current {
        store.current(filter).await
    } else {
        store.list(filter).await
    };
    records.map(Json).map_err(reject)
}

async fn log_progress(
    State(state): State<AppStateArc>,
    body: Result<Json<ProgressEntry>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProgressRecord>)> {
    let entry = json_body(body)?;
    let record = entry
        .into_record(state.tutor.curriculum())
        .map_err(reject)?;
    state.tutor.store().append(&record).await.map_err(reject)?;
    tracing::info!(
        "Logged {} min on '{}' (week {} day {})",
        record.minutes_spent,
        record.topic,
        record.week,
        record.day
    );
    Ok((StatusCode::CREATED, Json(record)))
}

async fn dashboard(State(state): State<AppStateArc>) -> ApiResult<Json<Dashboard>> {
    let records = state.tutor.store().list(None).await.map_err(reject)?;
    Ok(Json(Dashboard::build(state.tutor.curriculum(), records)))
}

// Tutor

pub fn tutor_routes() -> Router<AppStateArc> {
    Router::new().route("/api/ask", post(ask))
}

/// Request body; week and day default to the session position
#[derive(Debug, Deserialize)]
struct AskRequest {
    kind: RequestKind,
    week: Option<u32>,
    day: Option<u32>,
    #[serde(default)]
    payload: Option<String>,
    #[serde(default)]
    details: RequestDetails,
}

async fn ask(
    State(state): State<AppStateArc>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> ApiResult<Json<BackendResponse>> {
    let body = json_body(body)?;
    if let Some(problem) = &state.config_error {
        return Err(reject(Error::configuration(format!(
            "{}; edit mentor.json or set the environment variables, then restart",
            problem
        ))));
    }

    let session = state.session.read().await.clone();
    let request = Request {
        kind: body.kind,
        week: body.week.unwrap_or(session.position.week),
        day: body.day.unwrap_or(session.position.day),
        payload: body.payload,
        details: body.details,
    };

    state
        .tutor
        .ask(&session, request)
        .await
        .map(Json)
        .map_err(reject)
}

// Backend

pub fn backend_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/backend", get(backend_status))
        .route("/api/backend/refresh", post(refresh_backend))
}

#[derive(Debug, Serialize)]
struct BackendStatus {
    backend: &'static str,
    default_model: Option<String>,
    available_models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    config_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn status_of(state: &AppState) -> BackendStatus {
    let dispatcher = state.tutor.dispatcher();
    BackendStatus {
        backend: dispatcher.backend_name(),
        default_model: dispatcher.default_model().map(str::to_string),
        available_models: dispatcher.available_models().await,
        config_error: state.config_error.clone(),
        error: state.backend_error.read().await.clone(),
    }
}

async fn backend_status(State(state): State<AppStateArc>) -> Json<BackendStatus> {
    Json(status_of(&state).await)
}

async fn refresh_backend(State(state): State<AppStateArc>) -> Json<BackendStatus> {
    let dispatcher = state.tutor.dispatcher();
    let hint = dispatcher
        .refresh_models()
        .await
        .err()
        .map(|e| e.setup_hint(dispatcher.backend_name()));
    *state.backend_error.write().await = hint;
    Json(status_of(&state).await)
}

// Session

pub fn session_routes() -> Router<AppStateArc> {
    Router::new().route("/api/session", get(get_session).put(update_session))
}

async fn get_session(State(state): State<AppStateArc>) -> Json<SessionContext> {
    Json(state.session.read().await.clone())
}

async fn update_session(
    State(state): State<AppStateArc>,
    body: Result<Json<SessionUpdate>, JsonRejection>,
) -> ApiResult<Json<SessionContext>> {
    let update = json_body(body)?;
    let mut session = state.session.write().await;
    session
        .apply(update, state.tutor.curriculum())
        .map_err(reject)?;
    tracing::debug!(
        "Session moved to week {} day {}",
        session.position.week,
        session.position.day
    );
    Ok(Json(session.clone()))
}
