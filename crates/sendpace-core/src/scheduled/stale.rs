//! Stale batch detection and manual recovery
//!
//! A batch whose earliest pending message is more than an hour overdue is
//! never sent automatically. The detector surfaces one such batch at a
//! time and applies the operator's decision: send it now or cancel it.

use chrono::{DateTime, Utc};
use sendpace_common::types::BatchId;
use sendpace_common::{Error, Result};
use sendpace_storage::models::ScheduledBatch;
use sendpace_storage::repository::ScheduledMessageRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Default interval between checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Operator decision for a stale batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleResolution {
    /// Move the pending messages to now so the next tick picks them up
    SendNow,
    /// Delete the pending messages
    Cancel,
}

/// Result of resolving a stale batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolveOutcome {
    pub batch_id: BatchId,
    pub resolution: StaleResolution,
    pub affected: u64,
    /// The next stale batch, if any
    pub next_stale: Option<ScheduledBatch>,
}

/// Watches for stale batches
pub struct StaleBatchDetector {
    messages: Arc<dyn ScheduledMessageRepository>,
    threshold: chrono::Duration,
    poll_interval: Duration,
    current: watch::Sender<Option<ScheduledBatch>>,
}

impl StaleBatchDetector {
    pub fn new(messages: Arc<dyn ScheduledMessageRepository>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            messages,
            threshold: chrono::Duration::hours(1),
            poll_interval: DEFAULT_POLL_INTERVAL,
            current,
        }
    }

    pub fn with_threshold(mut self, threshold: chrono::Duration) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The currently surfaced stale batch
    pub fn current(&self) -> Option<ScheduledBatch> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ScheduledBatch>> {
        self.current.subscribe()
    }

    /// Look for stale batches now and publish the first one found
    pub async fn check(&self) -> Result<Option<ScheduledBatch>> {
        self.check_at(Utc::now()).await
    }

    pub async fn check_at(&self, now: DateTime<Utc>) -> Result<Option<ScheduledBatch>> {
        let stale = self
            .messages
            .list_pending_batches()
            .await?
            .into_iter()
            .find(|batch| batch.is_stale(now, self.threshold));

        let changed = self.current.borrow().as_ref().map(|b| b.batch_id)
            != stale.as_ref().map(|b| b.batch_id);

        if changed {
            if let Some(batch) = &stale {
                warn!(
                    batch_id = %batch.batch_id,
                    "Batch with {} pending messages is overdue since {}",
                    batch.pending_count, batch.scheduled_for
                );
            }
        }

        self.current.send_replace(stale.clone());
        Ok(stale)
    }

    /// Apply an operator decision, then re-check immediately
    pub async fn resolve(
        &self,
        batch_id: BatchId,
        resolution: StaleResolution,
    ) -> Result<ResolveOutcome> {
        let affected = match resolution {
            StaleResolution::SendNow => {
                self.messages
                    .reschedule_batch(batch_id, Utc::now())
                    .await?
            }
            StaleResolution::Cancel => self.messages.delete_pending_batch(batch_id).await?,
        };

        if affected == 0 {
            return Err(Error::NotFound(format!(
                "No pending messages in batch {}",
                batch_id
            )));
        }

        info!(
            batch_id = %batch_id,
            "Stale batch resolved with {:?} ({} messages)", resolution, affected
        );

        let next_stale = match self.check().await {
            Ok(next) => next,
            Err(e) => {
                warn!("Stale re-check failed: {}", e);
                None
            }
        };

        Ok(ResolveOutcome {
            batch_id,
            resolution,
            affected,
            next_stale,
        })
    }

    /// Poll on a fixed interval until `shutdown` fires
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Stale batch detector started (interval: {}s, threshold: {}m)",
            self.poll_interval.as_secs(),
            self.threshold.num_minutes()
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Stale batch detector stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.check().await {
                        error!("Stale batch check failed: {}", e);
                    }
                }
            }
        }
    }
}
