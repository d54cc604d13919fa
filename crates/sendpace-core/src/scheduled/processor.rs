//! Scheduled batch processor
//!
//! A periodic sweep that sends due scheduled messages with the same pacing
//! as the interactive queue. Only messages due within the last hour are
//! picked up; anything older is stale and waits for a manual decision.
//! All state lives in the persisted message status.

use crate::analytics::AnalyticsEngine;
use crate::campaign::CampaignLifecycle;
use crate::delay::SafetyDelay;
use crate::messaging::MessagingClient;
use chrono::Utc;
use sendpace_common::types::{normalize_phone, BatchId, MediaPayload};
use sendpace_common::Result;
use sendpace_storage::models::{CampaignCounts, ScheduledMessage};
use sendpace_storage::repository::{ScheduledMessageRepository, TemplateRepository};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default interval between ticks
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Why a tick did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyRunning,
    ClientNotReady,
}

/// Counts for one processed tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    pub selected: usize,
    pub sent: u64,
    pub failed: u64,
}

/// Result of a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    Processed(TickSummary),
    Skipped(SkipReason),
}

/// Clears the running flag when dropped
struct TickGuard<'a> {
    running: &'a AtomicBool,
}

impl<'a> TickGuard<'a> {
    fn acquire(running: &'a AtomicBool) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { running })
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Scheduled batch processor
pub struct ScheduledBatchProcessor {
    messages: Arc<dyn ScheduledMessageRepository>,
    templates: Arc<dyn TemplateRepository>,
    client: Arc<dyn MessagingClient>,
    campaigns: Arc<CampaignLifecycle>,
    analytics: Arc<AnalyticsEngine>,
    delay: SafetyDelay,
    tick_interval: Duration,
    /// How far back a due message is still sent automatically
    window: chrono::Duration,
    running: AtomicBool,
}

impl ScheduledBatchProcessor {
    /// Create a new processor
    pub fn new(
        messages: Arc<dyn ScheduledMessageRepository>,
        templates: Arc<dyn TemplateRepository>,
        client: Arc<dyn MessagingClient>,
        campaigns: Arc<CampaignLifecycle>,
        analytics: Arc<AnalyticsEngine>,
    ) -> Self {
        Self {
            messages,
            templates,
            client,
            campaigns,
            analytics,
            delay: SafetyDelay::default(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            window: chrono::Duration::hours(1),
            running: AtomicBool::new(false),
        }
    }

    /// Set the pacing delay between messages
    pub fn with_delay(mut self, delay: SafetyDelay) -> Self {
        self.delay = delay;
        self
    }

    /// Set the tick interval
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the staleness window
    pub fn with_window(mut self, window: chrono::Duration) -> Self {
        self.window = window;
        self
    }

    /// Tick on a fixed interval until `shutdown` fires.
    ///
    /// Each tick runs on its own task so that a slow tick is visible to
    /// the reentrancy guard instead of delaying the ticker. On shutdown the
    /// loop waits for in-flight ticks, which stop after their current
    /// message.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Scheduled batch processor started (interval: {}s, window: {}m)",
            self.tick_interval.as_secs(),
            self.window.num_minutes()
        );

        let mut ticks = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let processor = Arc::clone(&self);
                    let shutdown = shutdown.clone();
                    ticks.spawn(async move { processor.run_tick(&shutdown).await });
                }
                Some(joined) = ticks.join_next(), if !ticks.is_empty() => {
                    if let Err(e) = joined {
                        error!("Scheduled tick task failed: {}", e);
                    }
                }
            }
        }

        while let Some(joined) = ticks.join_next().await {
            if let Err(e) = joined {
                error!("Scheduled tick task failed: {}", e);
            }
        }

        info!("Scheduled batch processor stopped");
    }

    async fn run_tick(&self, shutdown: &CancellationToken) {
        match self.tick_until(shutdown).await {
            Ok(TickOutcome::Processed(summary)) if summary.selected > 0 => info!(
                "Scheduled tick done (selected: {}, sent: {}, failed: {})",
                summary.selected, summary.sent, summary.failed
            ),
            Ok(TickOutcome::Processed(_)) => {}
            Ok(TickOutcome::Skipped(reason)) => debug!("Scheduled tick skipped: {:?}", reason),
            Err(e) => error!("Scheduled tick failed: {}", e),
        }
    }

    /// Process every due message once.
    ///
    /// A tick that overlaps a running one, or finds the messaging client
    /// not ready, returns without touching the store.
    pub async fn tick(&self) -> Result<TickOutcome> {
        self.tick_until(&CancellationToken::new()).await
    }

    /// Same as [`tick`](Self::tick), stopping before the next message once
    /// `shutdown` fires. Unprocessed messages stay pending.
    async fn tick_until(&self, shutdown: &CancellationToken) -> Result<TickOutcome> {
        let Some(_guard) = TickGuard::acquire(&self.running) else {
            debug!("Previous scheduled tick still running");
            return Ok(TickOutcome::Skipped(SkipReason::AlreadyRunning));
        };

        if !self.client.is_ready().await {
            warn!("Messaging client not ready, skipping scheduled tick");
            return Ok(TickOutcome::Skipped(SkipReason::ClientNotReady));
        }

        let now = Utc::now();
        let due = self.messages.get_due(now, now - self.window).await?;
        let mut summary = TickSummary {
            selected: due.len(),
            ..Default::default()
        };

        if due.is_empty() {
            return Ok(TickOutcome::Processed(summary));
        }

        debug!("Processing {} due scheduled messages", due.len());

        let total = due.len();
        let mut position = 0;

        let mut stopped = false;

        for run in group_by_batch(due) {
            let batch_id = run[0].batch_id;
            let name = format!("Scheduled batch {}", short_id(batch_id));
            let campaign_id = self.campaigns.create_campaign(&name, run.len()).await;
            let mut counts = CampaignCounts::default();

            for message in &run {
                if shutdown.is_cancelled() {
                    stopped = true;
                    break;
                }
                position += 1;

                if self.process_message(message).await {
                    counts.sent += 1;
                    summary.sent += 1;
                } else {
                    counts.failed += 1;
                    summary.failed += 1;
                }

                if position < total {
                    tokio::select! {
                        _ = shutdown.cancelled() => {}
                        _ = tokio::time::sleep(self.delay.next_delay()) => {}
                    }
                }
            }

            self.campaigns.complete_campaign(campaign_id, counts).await;
            if stopped {
                info!(
                    "Scheduled tick stopped by shutdown, {} messages left pending",
                    total - position
                );
                break;
            }
        }

        Ok(TickOutcome::Processed(summary))
    }

    /// Send one message and persist the outcome. Returns whether it was sent.
    async fn process_message(&self, message: &ScheduledMessage) -> bool {
        let phone = normalize_phone(&message.contact_phone);

        match self.deliver(message, &phone).await {
            Ok(()) => {
                debug!(message_id = %message.id, phone = %phone, "Scheduled message sent");
                match self.messages.mark_sent(message.id, Utc::now()).await {
                    Ok(true) => {}
                    Ok(false) => warn!(message_id = %message.id, "Message was no longer pending"),
                    Err(e) => error!(message_id = %message.id, "Failed to mark message as sent: {}", e),
                }
                self.analytics.track_message_sent(&phone).await;
                true
            }
            Err(reason) => {
                warn!(message_id = %message.id, phone = %phone, "Scheduled message failed: {}", reason);
                if let Err(e) = self
                    .messages
                    .mark_failed(message.id, &reason, Utc::now())
                    .await
                {
                    error!(message_id = %message.id, "Failed to mark message as failed: {}", e);
                }
                false
            }
        }
    }

    async fn deliver(&self, message: &ScheduledMessage, phone: &str) -> std::result::Result<(), String> {
        if phone.is_empty() {
            return Err(format!(
                "'{}' is not a valid phone number",
                message.contact_phone
            ));
        }

        let template = match self.templates.get(message.template_id).await {
            Ok(Some(template)) => template,
            Ok(None) => return Err(format!("Template {} not found", message.template_id)),
            Err(e) => return Err(format!("Failed to load template: {}", e)),
        };

        let media = MediaPayload::from_json(template.media.as_deref());
        let body = Some(template.content.as_str()).filter(|c| !c.trim().is_empty());

        if body.is_none() && media.is_none() {
            return Err(format!("Template {} has no content", template.id));
        }

        self.client
            .send(phone, body, media.as_ref())
            .await
            .map_err(|e| e.to_string())
    }
}

/// Split messages into runs of consecutive messages sharing a batch
fn group_by_batch(messages: Vec<ScheduledMessage>) -> Vec<Vec<ScheduledMessage>> {
    let mut runs: Vec<Vec<ScheduledMessage>> = Vec::new();
    for message in messages {
        match runs.last_mut() {
            Some(run) if run[0].batch_id == message.batch_id => run.push(message),
            _ => runs.push(vec![message]),
        }
    }
    runs
}

fn short_id(id: BatchId) -> String {
    id.simple().to_string()[..8].to_string()
}
