//! api.rs: JSON surface for the presentation layer.
//!
//! Reads come from the session's latest snapshot; writes are forwarded as
//! commands and answered with the snapshot taken right after they ran.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::filter::{FilterCriteria, KNOWN_SOURCES};
use crate::ingest::types::Tone;
use crate::session::{SessionCommand, SessionHandle, ViewSnapshot};

#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/news", get(get_news))
        .route("/sources", get(get_sources))
        .route("/criteria", put(put_criteria))
        .route("/criteria/reset", post(reset_criteria))
        .route("/refresh", post(refresh))
        .route("/tone", put(put_tone))
        .route("/notification/dismiss", post(dismiss_notification))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

struct ApiError(anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(target: "api", error = ?self.0, "session unavailable");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

type ApiResult = Result<Json<ViewSnapshot>, ApiError>;

async fn get_news(State(state): State<AppState>) -> Json<ViewSnapshot> {
    Json(state.session.snapshot())
}

#[derive(serde::Serialize)]
struct SourceOut {
    id: &'static str,
    name: &'static str,
}

async fn get_sources() -> Json<Vec<SourceOut>> {
    Json(
        KNOWN_SOURCES
            .iter()
            .map(|&(id, name)| SourceOut { id, name })
            .collect(),
    )
}

async fn put_criteria(
    State(state): State<AppState>,
    Json(criteria): Json<FilterCriteria>,
) -> ApiResult {
    let snap = state
        .session
        .request(SessionCommand::SetCriteria(criteria))
        .await?;
    Ok(Json(snap))
}

async fn reset_criteria(State(state): State<AppState>) -> ApiResult {
    let snap = state.session.request(SessionCommand::ResetCriteria).await?;
    Ok(Json(snap))
}

async fn refresh(State(state): State<AppState>) -> ApiResult {
    let snap = state.session.request(SessionCommand::Refresh).await?;
    Ok(Json(snap))
}

#[derive(Deserialize)]
struct ToneReq {
    tone: Tone,
}

async fn put_tone(State(state): State<AppState>, Json(body): Json<ToneReq>) -> ApiResult {
    let snap = state
        .session
        .request(SessionCommand::SetTone(body.tone))
        .await?;
    Ok(Json(snap))
}

async fn dismiss_notification(State(state): State<AppState>) -> ApiResult {
    let snap = state
        .session
        .request(SessionCommand::DismissNotification)
        .await?;
    Ok(Json(snap))
}
