//! Interactive dispatch handlers

use axum::{extract::State, http::StatusCode, Json};
use sendpace_core::dispatch::LogEntry;
use sendpace_core::{DispatchProgress, DispatchRequest};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::error::{api_error, ApiResult};
use crate::state::AppState;

/// Stop response
#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub stopped: bool,
}

/// Log response
#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub data: Vec<LogEntry>,
}

/// Start a dispatch
///
/// POST /api/v1/dispatch
pub async fn start_dispatch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DispatchRequest>,
) -> ApiResult<(StatusCode, Json<DispatchProgress>)> {
    let recipients = request.recipients.len();
    let progress = state.dispatch.start(request).await.map_err(api_error)?;

    info!("Dispatch to {} recipients accepted", recipients);
    Ok((StatusCode::ACCEPTED, Json(progress)))
}

/// Stop the running dispatch
///
/// POST /api/v1/dispatch/stop
pub async fn stop_dispatch(State(state): State<Arc<AppState>>) -> Json<StopResponse> {
    Json(StopResponse {
        stopped: state.dispatch.stop().await,
    })
}

/// Current progress
///
/// GET /api/v1/dispatch/progress
pub async fn get_progress(State(state): State<Arc<AppState>>) -> Json<DispatchProgress> {
    Json(state.dispatch.progress())
}

/// Recent log entries, oldest first
///
/// GET /api/v1/dispatch/logs
pub async fn get_logs(State(state): State<Arc<AppState>>) -> Json<LogResponse> {
    Json(LogResponse {
        data: state.dispatch.logs().await,
    })
}
