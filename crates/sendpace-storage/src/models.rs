//! Database models

use chrono::{DateTime, Duration, Utc};
use sendpace_common::types::{BatchId, CampaignId, ScheduledMessageId, TemplateId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============================================================================
// Campaigns
// ============================================================================

/// Campaign model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    pub total_contacts: i64,
    pub sent_count: i64,
    pub failed_count: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub immediate_report_sent: bool,
}

impl Campaign {
    /// Whether the owning operation has finalized this campaign
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Share of attempted sends that succeeded, as a percentage
    pub fn success_rate(&self) -> f64 {
        let attempted = self.sent_count + self.failed_count;
        if attempted == 0 {
            0.0
        } else {
            (self.sent_count as f64 / attempted as f64) * 100.0
        }
    }

    /// Contacts that were never attempted (stopped campaigns)
    pub fn skipped_count(&self) -> i64 {
        (self.total_contacts - self.sent_count - self.failed_count).max(0)
    }

    /// Wall-clock duration, if completed
    pub fn duration(&self) -> Option<Duration> {
        self.completed_at.map(|done| done - self.started_at)
    }
}

/// Create campaign input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCampaign {
    pub name: String,
    pub total_contacts: i64,
}

/// Final outcome counts of a dispatch operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignCounts {
    pub sent: i64,
    pub failed: i64,
}

// ============================================================================
// Templates (read-only to the engine)
// ============================================================================

/// Message template model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub content: String,
    /// JSON encoded media payload
    pub media: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create template input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTemplate {
    pub name: String,
    pub content: String,
    pub media: Option<String>,
}

// ============================================================================
// Scheduled messages
// ============================================================================

/// Scheduled message status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledMessageStatus {
    Pending,
    Sent,
    Failed,
}

impl std::fmt::Display for ScheduledMessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduledMessageStatus::Pending => write!(f, "pending"),
            ScheduledMessageStatus::Sent => write!(f, "sent"),
            ScheduledMessageStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ScheduledMessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ScheduledMessageStatus::Pending),
            "sent" => Ok(ScheduledMessageStatus::Sent),
            "failed" => Ok(ScheduledMessageStatus::Failed),
            _ => Err(format!("Invalid scheduled message status: {}", s)),
        }
    }
}

/// Scheduled message model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ScheduledMessage {
    pub id: ScheduledMessageId,
    pub contact_name: String,
    pub contact_phone: String,
    pub template_id: TemplateId,
    pub scheduled_for: DateTime<Utc>,
    pub status: String,
    pub batch_id: BatchId,
    pub last_error: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledMessage {
    /// Get status enum
    pub fn status_enum(&self) -> Option<ScheduledMessageStatus> {
        self.status.parse().ok()
    }

    pub fn is_pending(&self) -> bool {
        self.status_enum() == Some(ScheduledMessageStatus::Pending)
    }
}

/// Create scheduled message input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduledMessage {
    pub contact_name: String,
    pub contact_phone: String,
    pub template_id: TemplateId,
    pub scheduled_for: DateTime<Utc>,
    pub batch_id: BatchId,
}

/// Summary of a batch that still has pending messages
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ScheduledBatch {
    pub batch_id: BatchId,
    pub template_id: TemplateId,
    /// Earliest due time among the pending messages
    pub scheduled_for: DateTime<Utc>,
    pub pending_count: i64,
}

impl ScheduledBatch {
    /// Whether the batch has been due for longer than `threshold`
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        now - self.scheduled_for > threshold
    }
}

// ============================================================================
// Contact analytics
// ============================================================================

/// Per-contact send/read counters
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ContactAnalytics {
    pub phone: String,
    pub sent_count: i64,
    pub read_count: i64,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub last_read_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Reporting (owned by the reporting collaborator)
// ============================================================================

/// Report configuration model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ReportConfig {
    pub id: i64,
    pub send_immediate: bool,
    pub daily_enabled: bool,
    pub updated_at: DateTime<Utc>,
}

/// Report recipient model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReportRecipient {
    pub id: uuid::Uuid,
    pub name: String,
    pub phone: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
