//! Engagement analytics handlers

use axum::{
    extract::{Path, State},
    Json,
};
use sendpace_core::{ContactEngagement, EngagementSummary};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{api_error, validation_error, ApiResult};
use crate::state::AppState;

/// Read acknowledgments for one or more phones
#[derive(Debug, Deserialize)]
pub struct ReadAcksRequest {
    pub phones: Vec<String>,
}

/// Number of contact records updated
#[derive(Debug, Serialize)]
pub struct ReadAcksResponse {
    pub received: usize,
    pub updated: u64,
}

/// Engagement of one contact
///
/// GET /api/v1/analytics/:phone
pub async fn get_contact_engagement(
    State(state): State<Arc<AppState>>,
    Path(phone): Path<String>,
) -> ApiResult<Json<ContactEngagement>> {
    let engagement = state
        .analytics
        .contact_engagement(&phone)
        .await
        .map_err(api_error)?;
    Ok(Json(engagement))
}

/// Contacts per engagement status
///
/// GET /api/v1/analytics
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<EngagementSummary>> {
    let summary = state
        .analytics
        .engagement_summary()
        .await
        .map_err(api_error)?;
    Ok(Json(summary))
}

/// Record read acknowledgments
///
/// POST /api/v1/analytics/reads
pub async fn record_reads(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ReadAcksRequest>,
) -> ApiResult<Json<ReadAcksResponse>> {
    if input.phones.is_empty() {
        return Err(validation_error("At least one phone is required"));
    }

    let updated = if input.phones.len() == 1 {
        u64::from(state.analytics.track_message_read(&input.phones[0]).await)
    } else {
        state.analytics.track_batch_read(&input.phones).await
    };

    Ok(Json(ReadAcksResponse {
        received: input.phones.len(),
        updated,
    }))
}
