//! Campaign history handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use sendpace_storage::models::Campaign;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{api_error, not_found, ApiResult};
use crate::state::AppState;

/// Query parameters for listing campaigns
#[derive(Debug, Deserialize)]
pub struct ListCampaignsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// Campaign list response
#[derive(Debug, Serialize)]
pub struct CampaignListResponse {
    pub data: Vec<CampaignResponse>,
    pub limit: i64,
}

/// Campaign response
#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    pub id: Uuid,
    pub name: String,
    pub total_contacts: i64,
    pub sent_count: i64,
    pub failed_count: i64,
    pub success_rate: f64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<i64>,
    pub immediate_report_sent: bool,
}

impl From<Campaign> for CampaignResponse {
    fn from(c: Campaign) -> Self {
        let success_rate = c.success_rate();
        let duration_secs = c.duration().map(|d| d.num_seconds());
        Self {
            id: c.id,
            name: c.name,
            total_contacts: c.total_contacts,
            sent_count: c.sent_count,
            failed_count: c.failed_count,
            success_rate,
            started_at: c.started_at,
            completed_at: c.completed_at,
            duration_secs,
            immediate_report_sent: c.immediate_report_sent,
        }
    }
}

/// List recent campaigns, newest first
///
/// GET /api/v1/campaigns
pub async fn list_campaigns(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListCampaignsQuery>,
) -> ApiResult<Json<CampaignListResponse>> {
    let limit = query.limit.clamp(1, 500);
    let campaigns = state
        .campaigns
        .recent_campaigns(limit)
        .await
        .map_err(api_error)?;

    Ok(Json(CampaignListResponse {
        data: campaigns.into_iter().map(CampaignResponse::from).collect(),
        limit,
    }))
}

/// Get a campaign
///
/// GET /api/v1/campaigns/:campaign_id
pub async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
) -> ApiResult<Json<CampaignResponse>> {
    let campaign = state
        .campaigns
        .get_campaign(campaign_id)
        .await
        .map_err(api_error)?
        .ok_or_else(|| not_found(format!("Campaign {} not found", campaign_id)))?;

    Ok(Json(campaign.into()))
}
