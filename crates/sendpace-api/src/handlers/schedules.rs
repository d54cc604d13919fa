//! Scheduled batch handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use sendpace_core::scheduled::ResolveOutcome;
use sendpace_core::{ScheduleRequest, StaleResolution};
use sendpace_storage::models::ScheduledBatch;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{api_error, ApiResult};
use crate::state::AppState;

/// Pending batch list response
#[derive(Debug, Serialize)]
pub struct BatchListResponse {
    pub data: Vec<ScheduledBatch>,
}

/// Request body for moving a batch
#[derive(Debug, Deserialize)]
pub struct RescheduleRequest {
    pub scheduled_for: DateTime<Utc>,
}

/// Request body for resolving a stale batch
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub action: StaleResolution,
}

/// Number of messages touched by a batch operation
#[derive(Debug, Serialize)]
pub struct BatchUpdateResponse {
    pub batch_id: Uuid,
    pub affected: u64,
}

/// Currently surfaced stale batch
#[derive(Debug, Serialize)]
pub struct StaleResponse {
    pub stale: Option<ScheduledBatch>,
}

/// Create a scheduling request
///
/// POST /api/v1/schedules
pub async fn create_schedule(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScheduleRequest>,
) -> ApiResult<(StatusCode, Json<ScheduledBatch>)> {
    let batch = state.batches.schedule(request).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(batch)))
}

/// List batches with pending messages
///
/// GET /api/v1/schedules
pub async fn list_schedules(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<BatchListResponse>> {
    let data = state.batches.list_pending().await.map_err(api_error)?;
    Ok(Json(BatchListResponse { data }))
}

/// Cancel a batch
///
/// DELETE /api/v1/schedules/:batch_id
pub async fn cancel_schedule(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<Uuid>,
) -> ApiResult<Json<BatchUpdateResponse>> {
    let affected = state.batches.cancel(batch_id).await.map_err(api_error)?;
    Ok(Json(BatchUpdateResponse { batch_id, affected }))
}

/// Move a batch to a new time
///
/// POST /api/v1/schedules/:batch_id/reschedule
pub async fn reschedule(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<Uuid>,
    Json(input): Json<RescheduleRequest>,
) -> ApiResult<Json<BatchUpdateResponse>> {
    let affected = state
        .batches
        .reschedule(batch_id, input.scheduled_for)
        .await
        .map_err(api_error)?;
    Ok(Json(BatchUpdateResponse { batch_id, affected }))
}

/// The stale batch awaiting a decision
///
/// GET /api/v1/schedules/stale
pub async fn get_stale(State(state): State<Arc<AppState>>) -> Json<StaleResponse> {
    Json(StaleResponse {
        stale: state.stale.current(),
    })
}

/// Send a stale batch now or cancel it
///
/// POST /api/v1/schedules/:batch_id/resolve
pub async fn resolve_stale(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<Uuid>,
    Json(input): Json<ResolveRequest>,
) -> ApiResult<Json<ResolveOutcome>> {
    let outcome = state
        .stale
        .resolve(batch_id, input.action)
        .await
        .map_err(api_error)?;
    Ok(Json(outcome))
}
