//! Sequential dispatch queue
//!
//! One recipient is in flight at a time, in input order. A success is
//! followed by a safety delay and a failure by the fixed failure delay,
//! with no delay after the last recipient. The cancellation token is
//! checked before each send, before each delay and on every countdown
//! tick; a send already in flight is never interrupted.

use super::events::DispatchLog;
use super::progress::{DispatchProgress, DispatchState, RecipientState};
use crate::analytics::AnalyticsEngine;
use crate::campaign::CampaignLifecycle;
use crate::delay::Pacing;
use crate::messaging::{MessagingClient, MessagingError};
use chrono::Utc;
use sendpace_common::types::{normalize_phone, CampaignId, MediaPayload, Recipient};
use sendpace_common::{Error, Result};
use sendpace_storage::models::CampaignCounts;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A bulk send request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
    /// Campaign name; generated when absent
    #[serde(default)]
    pub name: Option<String>,
    pub recipients: Vec<Recipient>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub media: Option<MediaPayload>,
}

impl DispatchRequest {
    /// Message body, ignoring blank text
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref().filter(|b| !b.trim().is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.recipients.is_empty() {
            return Err(Error::Validation(
                "At least one recipient is required".to_string(),
            ));
        }

        if self.body().is_none() && self.media.is_none() {
            return Err(Error::Validation(
                "A message body or media payload is required".to_string(),
            ));
        }

        Ok(())
    }

    fn campaign_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Dispatch {}", Utc::now().format("%Y-%m-%d %H:%M")),
        }
    }
}

/// Final outcome of a dispatch operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub campaign_id: Option<CampaignId>,
    pub state: DispatchState,
    pub counts: CampaignCounts,
}

/// Runs dispatch operations
pub struct DispatchQueue {
    client: Arc<dyn MessagingClient>,
    campaigns: Arc<CampaignLifecycle>,
    analytics: Arc<AnalyticsEngine>,
    pacing: Pacing,
}

impl DispatchQueue {
    pub fn new(
        client: Arc<dyn MessagingClient>,
        campaigns: Arc<CampaignLifecycle>,
        analytics: Arc<AnalyticsEngine>,
        pacing: Pacing,
    ) -> Self {
        Self {
            client,
            campaigns,
            analytics,
            pacing,
        }
    }

    /// Send to every recipient in order until done or cancelled.
    ///
    /// The campaign is completed exactly once, with partial counts when
    /// the operation was cancelled.
    pub async fn run(
        &self,
        request: DispatchRequest,
        cancel: CancellationToken,
        progress: &watch::Sender<DispatchProgress>,
        log: &DispatchLog,
    ) -> DispatchSummary {
        let total = request.recipients.len();
        let name = request.campaign_name();
        let campaign_id = self.campaigns.create_campaign(&name, total).await;

        progress.send_replace(DispatchProgress {
            state: DispatchState::Running,
            campaign_id,
            total,
            ..Default::default()
        });

        info!(campaign = %name, "Dispatch started for {} contacts", total);
        log.info(format!("Starting '{}' for {} contacts", name, total))
            .await;

        let body = request.body();
        let media = request.media.as_ref();
        let mut counts = CampaignCounts::default();
        let mut aborted = false;

        for (index, recipient) in request.recipients.iter().enumerate() {
            if cancel.is_cancelled() {
                aborted = true;
                break;
            }

            progress.send_modify(|p| {
                p.current_index = index;
                p.current_recipient = Some(recipient.clone());
                p.recipient_state = Some(RecipientState::Sending);
                p.countdown_secs = None;
            });

            let phone = normalize_phone(&recipient.phone);
            let outcome = if phone.is_empty() {
                Err(MessagingError::Rejected(format!(
                    "'{}' is not a valid phone number",
                    recipient.phone
                )))
            } else {
                self.client.send(&phone, body, media).await
            };

            let delay = match outcome {
                Ok(()) => {
                    counts.sent += 1;
                    debug!(phone = %phone, "Message sent");
                    log.success(format!("Sent to {} ({})", recipient.name, phone))
                        .await;
                    self.analytics.track_message_sent(&phone).await;
                    progress.send_modify(|p| {
                        p.sent += 1;
                        p.recipient_state = Some(RecipientState::Sent);
                        p.update_percent();
                    });
                    self.pacing.safety.next_delay()
                }
                Err(e) => {
                    counts.failed += 1;
                    warn!(phone = %phone, "Send failed: {}", e);
                    log.failure(format!(
                        "Failed to send to {} ({}): {}",
                        recipient.name, phone, e
                    ))
                    .await;
                    progress.send_modify(|p| {
                        p.failed += 1;
                        p.recipient_state = Some(RecipientState::Failed);
                        p.update_percent();
                    });
                    self.pacing.failure_delay
                }
            };

            if index + 1 == total {
                break;
            }

            if cancel.is_cancelled() || !countdown(delay, &cancel, progress).await {
                aborted = true;
                break;
            }
        }

        let state = if aborted {
            DispatchState::Aborted
        } else {
            DispatchState::Completed
        };

        if aborted {
            info!(campaign = %name, "Dispatch stopped after {} attempts", counts.sent + counts.failed);
            log.info(format!(
                "Stopped: {} sent, {} failed",
                counts.sent, counts.failed
            ))
            .await;
        } else {
            info!(campaign = %name, "Dispatch finished (sent: {}, failed: {})", counts.sent, counts.failed);
            log.info(format!(
                "Finished: {} sent, {} failed",
                counts.sent, counts.failed
            ))
            .await;
        }

        self.campaigns.complete_campaign(campaign_id, counts).await;

        progress.send_modify(|p| {
            p.state = state;
            p.countdown_secs = None;
        });

        DispatchSummary {
            campaign_id,
            state,
            counts,
        }
    }
}

/// Wait out `delay` one second at a time, publishing the remaining
/// seconds. Returns `false` if cancelled while waiting.
async fn countdown(
    delay: Duration,
    cancel: &CancellationToken,
    progress: &watch::Sender<DispatchProgress>,
) -> bool {
    let mut remaining = delay;

    while !remaining.is_zero() {
        let secs = (remaining.as_millis() + 999) / 1000;
        progress.send_modify(|p| p.countdown_secs = Some(secs as u64));

        let step = remaining.min(Duration::from_secs(1));
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(step) => {}
        }
        remaining -= step;
    }

    progress.send_modify(|p| p.countdown_secs = None);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::SafetyDelay;
    use crate::testing::{FakeMessagingClient, InMemoryAnalytics, InMemoryCampaigns, RecordingReports};
    use pretty_assertions::assert_eq;
    use sendpace_storage::repository::{CampaignRepository, ContactAnalyticsRepository};
    use tokio::time::Instant;

    struct Harness {
        queue: DispatchQueue,
        client: Arc<FakeMessagingClient>,
        campaigns: Arc<InMemoryCampaigns>,
        analytics: Arc<InMemoryAnalytics>,
    }

    fn harness(client: FakeMessagingClient, pacing: Pacing) -> Harness {
        let client = Arc::new(client);
        let campaigns = Arc::new(InMemoryCampaigns::default());
        let analytics = Arc::new(InMemoryAnalytics::default());
        let lifecycle = Arc::new(CampaignLifecycle::new(
            campaigns.clone(),
            Arc::new(RecordingReports::default()),
        ));
        let queue = DispatchQueue::new(
            client.clone(),
            lifecycle,
            Arc::new(AnalyticsEngine::new(analytics.clone())),
            pacing,
        );
        Harness {
            queue,
            client,
            campaigns,
            analytics,
        }
    }

    fn request(phones: &[&str]) -> DispatchRequest {
        DispatchRequest {
            name: Some("Test".to_string()),
            recipients: phones
                .iter()
                .map(|p| Recipient::new(format!("Contact {}", p), *p))
                .collect(),
            body: Some("Hello".to_string()),
            media: None,
        }
    }

    fn fixed_pacing(success_ms: u64, failure_ms: u64) -> Pacing {
        Pacing::new(
            SafetyDelay::new(success_ms, success_ms),
            Duration::from_millis(failure_ms),
        )
    }

    #[test]
    fn test_validation() {
        assert!(request(&["1"]).validate().is_ok());
        assert!(matches!(request(&[]).validate(), Err(Error::Validation(_))));

        let mut no_content = request(&["1"]);
        no_content.body = Some("   ".to_string());
        assert!(matches!(no_content.validate(), Err(Error::Validation(_))));

        assert!(request(&["n/a"]).validate().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_phone_fails_only_that_recipient() {
        let h = harness(FakeMessagingClient::default(), fixed_pacing(10_000, 5_000));
        let (tx, _rx) = watch::channel(DispatchProgress::default());
        let log = DispatchLog::new(50);

        let start = Instant::now();
        let summary = h
            .queue
            .run(request(&["5511", "n/a", "5512"]), CancellationToken::new(), &tx, &log)
            .await;

        assert_eq!(h.client.attempted_phones(), vec!["5511", "5512"]);
        assert_eq!(summary.state, DispatchState::Completed);
        assert_eq!(summary.counts, CampaignCounts { sent: 2, failed: 1 });
        assert_eq!(start.elapsed(), Duration::from_secs(15));
        assert_eq!(h.campaigns.complete_calls(), 1);

        let failures: Vec<_> = log
            .snapshot()
            .await
            .into_iter()
            .filter(|e| e.kind == crate::dispatch::LogKind::Failure)
            .collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].message.contains("n/a"));
        assert_eq!(tx.borrow().percent, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sends_every_recipient_in_order() {
        let h = harness(FakeMessagingClient::default(), Pacing::default());
        let (tx, _rx) = watch::channel(DispatchProgress::default());
        let log = DispatchLog::new(50);

        let summary = h
            .queue
            .run(request(&["1", "2", "3", "4"]), CancellationToken::new(), &tx, &log)
            .await;

        assert_eq!(h.client.attempted_phones(), vec!["1", "2", "3", "4"]);
        assert_eq!(summary.state, DispatchState::Completed);
        assert_eq!(summary.counts, CampaignCounts { sent: 4, failed: 0 });
        assert_eq!(h.campaigns.complete_calls(), 1);

        let campaign = h
            .campaigns
            .get(summary.campaign_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(campaign.total_contacts, 4);
        assert_eq!(campaign.sent_count, 4);

        let stats = h.analytics.get("3").await.unwrap().unwrap();
        assert_eq!(stats.sent_count, 1);

        let progress = tx.borrow().clone();
        assert_eq!(progress.state, DispatchState::Completed);
        assert_eq!(progress.percent, 100);
        assert_eq!(progress.countdown_secs, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_uses_fixed_delay_and_skips_last_delay() {
        let h = harness(
            FakeMessagingClient::default().failing_for("2"),
            fixed_pacing(10_000, 5_000),
        );
        let (tx, _rx) = watch::channel(DispatchProgress::default());
        let log = DispatchLog::new(50);

        let start = Instant::now();
        let summary = h
            .queue
            .run(request(&["1", "2", "3"]), CancellationToken::new(), &tx, &log)
            .await;

        assert_eq!(start.elapsed(), Duration::from_secs(15));
        assert_eq!(summary.counts, CampaignCounts { sent: 2, failed: 1 });
        assert!(h.analytics.get("2").await.unwrap().is_none());

        let entries = log.snapshot().await;
        assert_eq!(
            entries
                .iter()
                .filter(|e| e.kind == crate::dispatch::LogKind::Failure)
                .count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start_sends_nothing() {
        let h = harness(FakeMessagingClient::default(), Pacing::default());
        let (tx, _rx) = watch::channel(DispatchProgress::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = h
            .queue
            .run(request(&["1", "2"]), cancel, &tx, &DispatchLog::new(10))
            .await;

        assert!(h.client.attempted_phones().is_empty());
        assert_eq!(summary.state, DispatchState::Aborted);
        assert_eq!(h.campaigns.complete_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_is_published_every_second() {
        let h = Arc::new(harness(FakeMessagingClient::default(), fixed_pacing(10_000, 0)));
        let (tx, rx) = watch::channel(DispatchProgress::default());
        let tx = Arc::new(tx);
        let cancel = CancellationToken::new();

        let task = tokio::spawn({
            let h = h.clone();
            let tx = tx.clone();
            let cancel = cancel.clone();
            async move {
                h.queue
                    .run(request(&["1", "2"]), cancel, &tx, &DispatchLog::new(10))
                    .await
            }
        });

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(rx.borrow().countdown_secs, Some(8));
        assert_eq!(rx.borrow().current_index, 0);

        let summary = task.await.unwrap();
        assert_eq!(summary.counts.sent, 2);
    }

    #[tokio::test]
    async fn test_missing_campaign_does_not_stop_dispatch() {
        let client = Arc::new(FakeMessagingClient::default());
        let lifecycle = Arc::new(CampaignLifecycle::new(
            Arc::new(InMemoryCampaigns::default().unavailable()),
            Arc::new(RecordingReports::default()),
        ));
        let queue = DispatchQueue::new(
            client.clone(),
            lifecycle,
            Arc::new(AnalyticsEngine::new(Arc::new(InMemoryAnalytics::default()))),
            Pacing::immediate(),
        );
        let (tx, _rx) = watch::channel(DispatchProgress::default());

        let summary = queue
            .run(request(&["1", "2"]), CancellationToken::new(), &tx, &DispatchLog::new(10))
            .await;

        assert_eq!(summary.campaign_id, None);
        assert_eq!(summary.counts.sent, 2);
        assert_eq!(client.attempted_phones().len(), 2);
    }
}
