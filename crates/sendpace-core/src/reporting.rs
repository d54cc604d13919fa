//! Campaign reports
//!
//! Report configuration and recipients are managed elsewhere. The engine
//! reads the configuration and asks for a plain-text summary to be
//! delivered to every active recipient.

use crate::messaging::MessagingClient;
use async_trait::async_trait;
use sendpace_common::{Error, Result};
use sendpace_storage::models::{Campaign, ReportConfig};
use sendpace_storage::repository::ReportConfigRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of a report delivery
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDelivery {
    pub success: bool,
    pub sent_to: Vec<String>,
}

/// Reporting boundary
#[async_trait]
pub trait ReportService: Send + Sync {
    async fn get_config(&self) -> Result<Option<ReportConfig>>;

    async fn ensure_default_config(&self) -> Result<ReportConfig>;

    fn format_immediate_report(&self, campaign: &Campaign) -> String;

    async fn send_report_to_all_recipients(&self, text: &str) -> Result<ReportDelivery>;
}

/// Delivers reports through the messaging client
pub struct MessagingReportService {
    repo: Arc<dyn ReportConfigRepository>,
    client: Arc<dyn MessagingClient>,
}

impl MessagingReportService {
    pub fn new(repo: Arc<dyn ReportConfigRepository>, client: Arc<dyn MessagingClient>) -> Self {
        Self { repo, client }
    }
}

fn format_duration(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {}m {}s", h, m, s)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{}s", s)
    }
}

#[async_trait]
impl ReportService for MessagingReportService {
    async fn get_config(&self) -> Result<Option<ReportConfig>> {
        self.repo.get_config().await
    }

    async fn ensure_default_config(&self) -> Result<ReportConfig> {
        self.repo.ensure_default().await
    }

    fn format_immediate_report(&self, campaign: &Campaign) -> String {
        let mut lines = vec![
            format!("Campaign report: {}", campaign.name),
            String::new(),
            format!("Contacts: {}", campaign.total_contacts),
            format!("Sent: {}", campaign.sent_count),
            format!("Failed: {}", campaign.failed_count),
        ];

        let skipped = campaign.skipped_count();
        if skipped > 0 {
            lines.push(format!("Not attempted: {}", skipped));
        }

        lines.push(format!("Success rate: {:.1}%", campaign.success_rate()));
        lines.push(format!(
            "Started: {}",
            campaign.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        if let Some(duration) = campaign.duration() {
            lines.push(format!("Duration: {}", format_duration(duration)));
        }

        lines.join("\n")
    }

    async fn send_report_to_all_recipients(&self, text: &str) -> Result<ReportDelivery> {
        let recipients = self
            .repo
            .list_active_recipients()
            .await
            .map_err(|e| Error::Report(format!("Failed to load report recipients: {}", e)))?;

        if recipients.is_empty() {
            info!("No active report recipients configured");
            return Ok(ReportDelivery::default());
        }

        let mut sent_to = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            match self.client.send(&recipient.phone, Some(text), None).await {
                Ok(()) => sent_to.push(recipient.phone),
                Err(e) => warn!(
                    recipient = %recipient.name,
                    "Failed to deliver report: {}", e
                ),
            }
        }

        Ok(ReportDelivery {
            success: !sent_to.is_empty(),
            sent_to,
        })
    }
}
