//! Dispatch controller - start, stop and observe the interactive dispatch

use super::events::{DispatchLog, LogEntry};
use super::progress::DispatchProgress;
use super::queue::{DispatchQueue, DispatchRequest, DispatchSummary};
use sendpace_common::{Error, Result};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

struct RunningDispatch {
    cancel: CancellationToken,
    handle: JoinHandle<DispatchSummary>,
}

impl RunningDispatch {
    fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Owns at most one running dispatch operation
pub struct DispatchController {
    queue: Arc<DispatchQueue>,
    progress: Arc<watch::Sender<DispatchProgress>>,
    log: DispatchLog,
    current: Mutex<Option<RunningDispatch>>,
}

impl DispatchController {
    pub fn new(queue: Arc<DispatchQueue>, log_capacity: usize) -> Self {
        let (progress, _) = watch::channel(DispatchProgress::default());
        Self {
            queue,
            progress: Arc::new(progress),
            log: DispatchLog::new(log_capacity),
            current: Mutex::new(None),
        }
    }

    /// Validate the request and start it on a background task.
    ///
    /// Fails with [`Error::Conflict`] while another dispatch is running.
    pub async fn start(&self, request: DispatchRequest) -> Result<DispatchProgress> {
        request.validate()?;

        let mut current = self.current.lock().await;
        if current.as_ref().is_some_and(RunningDispatch::is_active) {
            return Err(Error::Conflict(
                "A dispatch is already running".to_string(),
            ));
        }

        self.log.clear().await;
        self.progress.send_replace(DispatchProgress {
            state: super::DispatchState::Running,
            total: request.recipients.len(),
            ..Default::default()
        });

        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let queue = self.queue.clone();
            let progress = self.progress.clone();
            let log = self.log.clone();
            let cancel = cancel.clone();
            async move { queue.run(request, cancel, &progress, &log).await }
        });

        *current = Some(RunningDispatch { cancel, handle });
        Ok(self.progress())
    }

    /// Cancel the running dispatch. Returns `false` when nothing is running.
    pub async fn stop(&self) -> bool {
        let current = self.current.lock().await;
        match current.as_ref() {
            Some(running) if running.is_active() => {
                info!("Stopping dispatch");
                running.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.current
            .lock()
            .await
            .as_ref()
            .is_some_and(RunningDispatch::is_active)
    }

    /// Wait for the current (or last) operation and return its summary
    pub async fn wait(&self) -> Option<DispatchSummary> {
        let running = self.current.lock().await.take()?;
        match running.handle.await {
            Ok(summary) => Some(summary),
            Err(e) => {
                error!("Dispatch task failed: {}", e);
                None
            }
        }
    }

    /// Cancel any running operation and wait for it to finalize
    pub async fn shutdown(&self) {
        self.stop().await;
        self.wait().await;
    }

    pub fn progress(&self) -> DispatchProgress {
        self.progress.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DispatchProgress> {
        self.progress.subscribe()
    }

    pub async fn logs(&self) -> Vec<LogEntry> {
        self.log.snapshot().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::AnalyticsEngine;
    use crate::campaign::CampaignLifecycle;
    use crate::delay::{Pacing, SafetyDelay};
    use crate::dispatch::DispatchState;
    use crate::testing::{FakeMessagingClient, InMemoryAnalytics, InMemoryCampaigns, RecordingReports};
    use sendpace_common::types::Recipient;
    use sendpace_storage::models::CampaignCounts;
    use std::time::Duration;

    fn controller(client: Arc<FakeMessagingClient>) -> (DispatchController, Arc<InMemoryCampaigns>) {
        let campaigns = Arc::new(InMemoryCampaigns::default());
        let lifecycle = Arc::new(CampaignLifecycle::new(
            campaigns.clone(),
            Arc::new(RecordingReports::default()),
        ));
        let queue = DispatchQueue::new(
            client,
            lifecycle,
            Arc::new(AnalyticsEngine::new(Arc::new(InMemoryAnalytics::default()))),
            Pacing::new(SafetyDelay::new(10_000, 10_000), Duration::from_secs(5)),
        );
        (DispatchController::new(Arc::new(queue), 200), campaigns)
    }

    fn request(count: usize) -> DispatchRequest {
        DispatchRequest {
            name: None,
            recipients: (0..count)
                .map(|i| Recipient::new(format!("Contact {}", i), format!("55110{}", i)))
                .collect(),
            body: Some("Hello".to_string()),
            media: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_finalizes_with_partial_counts() {
        let client = Arc::new(FakeMessagingClient::default());
        let (controller, campaigns) = controller(client.clone());

        controller.start(request(5)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(controller.stop().await);

        let summary = controller.wait().await.unwrap();
        assert_eq!(summary.state, DispatchState::Aborted);
        assert_eq!(summary.counts, CampaignCounts { sent: 2, failed: 0 });
        assert_eq!(client.attempted_phones().len(), 2);
        assert_eq!(campaigns.complete_calls(), 1);

        let campaign = campaigns.all().pop().unwrap();
        assert_eq!(campaign.total_contacts, 5);
        assert_eq!(campaign.sent_count, 2);
        assert_eq!(controller.progress().state, DispatchState::Aborted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_never_interrupts_send_in_flight() {
        let (client, release) = FakeMessagingClient::default().gated();
        let client = Arc::new(client);
        let (controller, campaigns) = controller(client.clone());

        controller.start(request(3)).await.unwrap();
        client.entered().await;
        assert!(controller.stop().await);

        release.send(()).unwrap();
        let summary = controller.wait().await.unwrap();

        assert_eq!(summary.state, DispatchState::Aborted);
        assert_eq!(summary.counts, CampaignCounts { sent: 1, failed: 0 });
        assert_eq!(client.attempted_phones(), vec!["551100"]);
        assert_eq!(client.sent_phones(), vec!["551100"]);
        assert_eq!(campaigns.complete_calls(), 1);
        assert_eq!(campaigns.all().pop().unwrap().sent_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight() {
        let client = Arc::new(FakeMessagingClient::default());
        let (controller, _) = controller(client);

        controller.start(request(3)).await.unwrap();
        assert!(controller.is_running().await);

        let err = controller.start(request(1)).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let summary = controller.wait().await.unwrap();
        assert_eq!(summary.state, DispatchState::Completed);
        assert!(!controller.is_running().await);

        controller.start(request(1)).await.unwrap();
        assert_eq!(controller.wait().await.unwrap().counts.sent, 1);
    }

    #[tokio::test]
    async fn test_rejects_invalid_request_and_stop_when_idle() {
        let (controller, campaigns) = controller(Arc::new(FakeMessagingClient::default()));

        assert!(matches!(
            controller.start(request(0)).await,
            Err(Error::Validation(_))
        ));
        assert!(!controller.stop().await);
        assert!(campaigns.all().is_empty());
        assert_eq!(controller.progress().state, DispatchState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logs_are_reset_per_operation() {
        let (controller, _) = controller(Arc::new(FakeMessagingClient::default()));

        controller.start(request(2)).await.unwrap();
        controller.wait().await;
        // start, two sends, finish
        assert_eq!(controller.logs().await.len(), 4);

        controller.start(request(1)).await.unwrap();
        controller.wait().await;
        assert_eq!(controller.logs().await.len(), 3);
    }
}
