//! In-memory fakes shared by the unit tests

use crate::messaging::{MessagingClient, MessagingError};
use crate::reporting::{ReportDelivery, ReportService};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sendpace_common::types::{CampaignId, MediaPayload};
use sendpace_common::{Error, Result};
use sendpace_storage::models::{Campaign, CampaignCounts, ContactAnalytics, CreateCampaign, ReportConfig};
use sendpace_storage::repository::{CampaignRepository, ContactAnalyticsRepository};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::{oneshot, Notify};
use uuid::Uuid;

/// Messaging client that records every attempt
#[derive(Default)]
pub struct FakeMessagingClient {
    attempts: Mutex<Vec<String>>,
    sent: Mutex<Vec<String>>,
    failing: HashSet<String>,
    not_ready: AtomicBool,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    entered: Notify,
}

impl FakeMessagingClient {
    pub fn failing_for(mut self, phone: &str) -> Self {
        self.failing.insert(phone.to_string());
        self
    }

    pub fn not_ready(self) -> Self {
        self.not_ready.store(true, Ordering::SeqCst);
        self
    }

    /// Hold the first send until the returned sender fires
    pub fn gated(self) -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        *self.gate.lock().unwrap() = Some(rx);
        (self, tx)
    }

    /// Wait until the first send has started
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn attempted_phones(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn sent_phones(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingClient for FakeMessagingClient {
    async fn send(
        &self,
        phone: &str,
        _body: Option<&str>,
        _media: Option<&MediaPayload>,
    ) -> std::result::Result<(), MessagingError> {
        self.attempts.lock().unwrap().push(phone.to_string());
        self.entered.notify_one();

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if self.failing.contains(phone) {
            return Err(MessagingError::NotRegistered(phone.to_string()));
        }

        self.sent.lock().unwrap().push(phone.to_string());
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        !self.not_ready.load(Ordering::SeqCst)
    }
}

/// Campaign store kept in a map
#[derive(Default)]
pub struct InMemoryCampaigns {
    campaigns: Mutex<HashMap<CampaignId, Campaign>>,
    complete_calls: AtomicUsize,
    unavailable: bool,
}

impl InMemoryCampaigns {
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    pub fn all(&self) -> Vec<Campaign> {
        self.campaigns.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl CampaignRepository for InMemoryCampaigns {
    async fn create(&self, input: CreateCampaign) -> Result<Campaign> {
        if self.unavailable {
            return Err(Error::Database("store unavailable".to_string()));
        }

        let campaign = Campaign {
            id: Uuid::new_v4(),
            name: input.name,
            total_contacts: input.total_contacts,
            sent_count: 0,
            failed_count: 0,
            started_at: Utc::now(),
            completed_at: None,
            immediate_report_sent: false,
        };
        self.campaigns
            .lock()
            .unwrap()
            .insert(campaign.id, campaign.clone());
        Ok(campaign)
    }

    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>> {
        Ok(self.campaigns.lock().unwrap().get(&id).cloned())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Campaign>> {
        let mut all = self.all();
        all.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all.truncate(limit.max(0) as usize);
        Ok(all)
    }

    async fn complete(
        &self,
        id: CampaignId,
        counts: CampaignCounts,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<Campaign>> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        let mut campaigns = self.campaigns.lock().unwrap();
        match campaigns.get_mut(&id) {
            Some(c) if c.completed_at.is_none() => {
                c.sent_count = counts.sent;
                c.failed_count = counts.failed;
                c.completed_at = Some(completed_at);
                Ok(Some(c.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn claim_immediate_report(&self, id: CampaignId) -> Result<bool> {
        let mut campaigns = self.campaigns.lock().unwrap();
        match campaigns.get_mut(&id) {
            Some(c) if !c.immediate_report_sent => {
                c.immediate_report_sent = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_immediate_report(&self, id: CampaignId) -> Result<()> {
        if let Some(c) = self.campaigns.lock().unwrap().get_mut(&id) {
            c.immediate_report_sent = false;
        }
        Ok(())
    }
}

/// Analytics store kept in a map
#[derive(Default)]
pub struct InMemoryAnalytics {
    rows: Mutex<HashMap<String, ContactAnalytics>>,
    fail_batch: AtomicBool,
}

impl InMemoryAnalytics {
    pub fn fail_batch_reads(&self, fail: bool) {
        self.fail_batch.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContactAnalyticsRepository for InMemoryAnalytics {
    async fn record_sent(&self, phone: &str, at: DateTime<Utc>) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.entry(phone.to_string()).or_insert_with(|| ContactAnalytics {
            phone: phone.to_string(),
            sent_count: 0,
            read_count: 0,
            last_sent_at: None,
            last_read_at: None,
        });
        row.sent_count += 1;
        row.last_sent_at = Some(at);
        Ok(())
    }

    async fn record_read(&self, phone: &str, at: DateTime<Utc>) -> Result<u64> {
        match self.rows.lock().unwrap().get_mut(phone) {
            Some(row) => {
                row.read_count += 1;
                row.last_read_at = Some(at);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn record_reads(&self, phones: &[String], at: DateTime<Utc>) -> Result<u64> {
        if self.fail_batch.load(Ordering::SeqCst) {
            return Err(Error::Database("transaction aborted".to_string()));
        }
        let mut updated = 0;
        for phone in phones {
            updated += self.record_read(phone, at).await?;
        }
        Ok(updated)
    }

    async fn get(&self, phone: &str) -> Result<Option<ContactAnalytics>> {
        Ok(self.rows.lock().unwrap().get(phone).cloned())
    }

    async fn list(&self) -> Result<Vec<ContactAnalytics>> {
        let mut rows: Vec<_> = self.rows.lock().unwrap().values().cloned().collect();
        rows.sort_by(|a, b| a.phone.cmp(&b.phone));
        Ok(rows)
    }
}

/// Report service that records delivered texts
pub struct RecordingReports {
    send_immediate: bool,
    fail: bool,
    sent: Mutex<Vec<String>>,
}

impl Default for RecordingReports {
    fn default() -> Self {
        Self {
            send_immediate: true,
            fail: false,
            sent: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingReports {
    pub fn with_send_immediate(mut self, enabled: bool) -> Self {
        self.send_immediate = enabled;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn sent_reports(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    fn config(&self) -> ReportConfig {
        ReportConfig {
            id: 1,
            send_immediate: self.send_immediate,
            daily_enabled: false,
            updated_at: Utc::now(),
        }
    }
}

#[async_trait]
impl ReportService for RecordingReports {
    async fn get_config(&self) -> Result<Option<ReportConfig>> {
        Ok(Some(self.config()))
    }

    async fn ensure_default_config(&self) -> Result<ReportConfig> {
        Ok(self.config())
    }

    fn format_immediate_report(&self, campaign: &Campaign) -> String {
        format!("report for {}", campaign.name)
    }

    async fn send_report_to_all_recipients(&self, text: &str) -> Result<ReportDelivery> {
        if self.fail {
            return Err(Error::Report("bridge offline".to_string()));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(ReportDelivery {
            success: true,
            sent_to: vec!["5511000".to_string()],
        })
    }
}
