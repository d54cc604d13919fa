//! Campaign lifecycle
//!
//! A campaign tracks one bulk-send operation. Tracking and reporting are
//! telemetry: every failure here is logged and swallowed so that dispatch
//! never stalls on them.

use crate::reporting::ReportService;
use chrono::Utc;
use sendpace_common::types::CampaignId;
use sendpace_common::Result;
use sendpace_storage::models::{Campaign, CampaignCounts, CreateCampaign};
use sendpace_storage::repository::CampaignRepository;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Creates, completes and reports campaigns
pub struct CampaignLifecycle {
    campaigns: Arc<dyn CampaignRepository>,
    reports: Arc<dyn ReportService>,
}

impl CampaignLifecycle {
    pub fn new(campaigns: Arc<dyn CampaignRepository>, reports: Arc<dyn ReportService>) -> Self {
        Self { campaigns, reports }
    }

    /// Start tracking a campaign. Returns `None` when the store is unavailable.
    pub async fn create_campaign(&self, name: &str, total_contacts: usize) -> Option<CampaignId> {
        let input = CreateCampaign {
            name: name.to_string(),
            total_contacts: total_contacts as i64,
        };

        match self.campaigns.create(input).await {
            Ok(campaign) => {
                info!(
                    campaign_id = %campaign.id,
                    "Campaign '{}' started with {} contacts", campaign.name, total_contacts
                );
                Some(campaign.id)
            }
            Err(e) => {
                error!("Failed to create campaign '{}': {}", name, e);
                None
            }
        }
    }

    /// Persist final counts and trigger the immediate report
    pub async fn complete_campaign(&self, campaign_id: Option<CampaignId>, counts: CampaignCounts) {
        let Some(id) = campaign_id else {
            warn!(
                "Completing untracked campaign (sent: {}, failed: {})",
                counts.sent, counts.failed
            );
            return;
        };

        let campaign = match self.campaigns.complete(id, counts, Utc::now()).await {
            Ok(Some(campaign)) => campaign,
            Ok(None) => {
                warn!(campaign_id = %id, "Campaign not found or already completed");
                return;
            }
            Err(e) => {
                error!(campaign_id = %id, "Failed to complete campaign: {}", e);
                return;
            }
        };

        info!(
            campaign_id = %id,
            "Campaign completed (sent: {}, failed: {})", campaign.sent_count, campaign.failed_count
        );

        self.send_immediate_report(&campaign).await;
    }

    /// Send the immediate report for a completed campaign if enabled.
    ///
    /// The report flag is claimed before sending, so at most one caller
    /// ever delivers it. A claim is released when nothing could be
    /// delivered. Returns whether a report went out.
    pub async fn send_immediate_report(&self, campaign: &Campaign) -> bool {
        if let Err(e) = self.reports.ensure_default_config().await {
            warn!("Failed to ensure report configuration: {}", e);
        }

        let config = match self.reports.get_config().await {
            Ok(Some(config)) => config,
            Ok(None) => {
                debug!("No report configuration, skipping immediate report");
                return false;
            }
            Err(e) => {
                warn!("Failed to read report configuration: {}", e);
                return false;
            }
        };

        if !config.send_immediate {
            return false;
        }

        match self.campaigns.claim_immediate_report(campaign.id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(campaign_id = %campaign.id, "Immediate report already sent");
                return false;
            }
            Err(e) => {
                warn!(campaign_id = %campaign.id, "Failed to claim immediate report: {}", e);
                return false;
            }
        }

        let text = self.reports.format_immediate_report(campaign);
        let delivered = match self.reports.send_report_to_all_recipients(&text).await {
            Ok(delivery) if delivery.success => {
                info!(
                    campaign_id = %campaign.id,
                    "Immediate report sent to {} recipients", delivery.sent_to.len()
                );
                true
            }
            Ok(_) => {
                warn!(campaign_id = %campaign.id, "Immediate report reached no recipients");
                false
            }
            Err(e) => {
                warn!(campaign_id = %campaign.id, "Failed to send immediate report: {}", e);
                false
            }
        };

        if !delivered {
            if let Err(e) = self.campaigns.release_immediate_report(campaign.id).await {
                warn!(campaign_id = %campaign.id, "Failed to release report claim: {}", e);
            }
        }

        delivered
    }

    pub async fn get_campaign(&self, id: CampaignId) -> Result<Option<Campaign>> {
        self.campaigns.get(id).await
    }

    pub async fn recent_campaigns(&self, limit: i64) -> Result<Vec<Campaign>> {
        self.campaigns.list_recent(limit).await
    }
}
