//! Dispatch progress snapshots

use sendpace_common::types::{CampaignId, Recipient};
use serde::{Deserialize, Serialize};

/// State of a dispatch operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
    #[default]
    Idle,
    Running,
    Completed,
    Aborted,
}

impl DispatchState {
    pub fn is_finished(&self) -> bool {
        matches!(self, DispatchState::Completed | DispatchState::Aborted)
    }
}

/// State of the recipient currently being handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientState {
    Pending,
    Sending,
    Sent,
    Failed,
}

/// Point-in-time view of a dispatch operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchProgress {
    pub state: DispatchState,
    pub campaign_id: Option<CampaignId>,
    /// Zero-based index of the current recipient
    pub current_index: usize,
    pub total: usize,
    /// Share of recipients handled, 0-100
    pub percent: u8,
    pub sent: u64,
    pub failed: u64,
    pub current_recipient: Option<Recipient>,
    pub recipient_state: Option<RecipientState>,
    /// Seconds until the next send, while waiting
    pub countdown_secs: Option<u64>,
}

impl DispatchProgress {
    pub fn processed(&self) -> u64 {
        self.sent + self.failed
    }

    pub(crate) fn update_percent(&mut self) {
        self.percent = if self.total == 0 {
            0
        } else {
            ((self.processed() * 100) / self.total as u64).min(100) as u8
        };
    }
}
