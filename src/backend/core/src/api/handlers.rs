//! API request handlers.
//!
//! All handlers return `Result<impl IntoResponse, StriveError>` so that
//! denials and validation failures reach the client with their own status
//! and message.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::{ApiResponse, AppState, RequestAuth};
use crate::error::StriveError;
use crate::tenant::with_current_user;
use crate::transactions::{CreateLoopInput, LoopChanges, LoopQuery};

// ═══════════════════════════════════════════════════════════════════════════════
// Health and metrics
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// Access
// ═══════════════════════════════════════════════════════════════════════════════

/// What the signed-in user may see and do.
pub async fn access_summary(
    State(state): State<AppState>,
    auth: RequestAuth,
) -> Result<impl IntoResponse, StriveError> {
    let policy = state.policy.clone();
    let summary = with_current_user(&auth, "access_summary", |user| async move {
        Ok(policy.summarize(&user))
    })
    .await?;

    Ok(Json(ApiResponse::success(summary)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Transaction loops
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn list_loops(
    State(state): State<AppState>,
    auth: RequestAuth,
    ApiQuery(query): ApiQuery<LoopQuery>,
) -> Result<impl IntoResponse, StriveError> {
    let list = state.transactions.get_loops(&auth, query).await?;
    Ok(Json(ApiResponse::success(list)))
}

pub async fn loop_stats(
    State(state): State<AppState>,
    auth: RequestAuth,
) -> Result<impl IntoResponse, StriveError> {
    let stats = state.transactions.get_loop_stats(&auth).await?;
    Ok(Json(ApiResponse::success(stats)))
}

pub async fn get_loop(
    State(state): State<AppState>,
    auth: RequestAuth,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, StriveError> {
    let record = state.transactions.get_loop_by_id(&auth, id).await?;
    Ok(Json(ApiResponse::success(record)))
}

pub async fn create_loop(
    State(state): State<AppState>,
    auth: RequestAuth,
    ApiJson(input): ApiJson<CreateLoopInput>,
) -> Result<impl IntoResponse, StriveError> {
    let record = state.transactions.create_loop(&auth, input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))))
}

pub async fn update_loop(
    State(state): State<AppState>,
    auth: RequestAuth,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(changes): ApiJson<LoopChanges>,
) -> Result<impl IntoResponse, StriveError> {
    let record = state.transactions.update_loop(&auth, id, changes).await?;
    Ok(Json(ApiResponse::success(record)))
}

#[derive(Debug, Deserialize)]
pub struct ProgressUpdate {
    pub progress: i32,
}

pub async fn update_loop_progress(
    State(state): State<AppState>,
    auth: RequestAuth,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ProgressUpdate>,
) -> Result<impl IntoResponse, StriveError> {
    let progress = state
        .transactions
        .update_loop_progress(&auth, id, body.progress)
        .await?;
    Ok(Json(ApiResponse::success(serde_json::json!({ "progress": progress }))))
}

pub async fn delete_loop(
    State(state): State<AppState>,
    auth: RequestAuth,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, StriveError> {
    state.transactions.delete_loop(&auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
