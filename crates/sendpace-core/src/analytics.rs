//! Engagement analytics
//!
//! Sends upsert a contact's counters, read acknowledgments only ever update
//! an existing record. A read without a tracked send carries no meaning and
//! is dropped. Write paths are best-effort: failures are logged and never
//! reach the sender.

use chrono::{DateTime, Utc};
use sendpace_common::types::normalize_phone;
use sendpace_common::Result;
use sendpace_storage::models::ContactAnalytics;
use sendpace_storage::repository::ContactAnalyticsRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Minimum sends before a contact can be considered engaged
const ENGAGED_MIN_SENT: i64 = 3;

/// Minimum read rate for an engaged contact
const ENGAGED_MIN_RATE: f64 = 0.6;

/// Reads younger than this many days are recent
const RECENT_DAYS: i64 = 7;

/// Reads older than this many days are old
const OLD_DAYS: i64 = 30;

/// Derived engagement label for a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngagementStatus {
    New,
    Sent,
    ReadToday,
    ReadRecent,
    ReadOld,
    Engaged,
}

impl std::fmt::Display for EngagementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EngagementStatus::New => "NEW",
            EngagementStatus::Sent => "SENT",
            EngagementStatus::ReadToday => "READ_TODAY",
            EngagementStatus::ReadRecent => "READ_RECENT",
            EngagementStatus::ReadOld => "READ_OLD",
            EngagementStatus::Engaged => "ENGAGED",
        };
        f.write_str(s)
    }
}

/// Read rate, 0 when nothing was sent
pub fn engagement_rate(stats: &ContactAnalytics) -> f64 {
    if stats.sent_count <= 0 {
        0.0
    } else {
        stats.read_count as f64 / stats.sent_count as f64
    }
}

/// Classify a contact. Rules are evaluated in order and the first match wins.
pub fn classify(stats: Option<&ContactAnalytics>, now: DateTime<Utc>) -> EngagementStatus {
    let stats = match stats {
        Some(s) if s.sent_count > 0 => s,
        _ => return EngagementStatus::New,
    };

    if stats.read_count == 0 {
        return EngagementStatus::Sent;
    }

    if let Some(last_read) = stats.last_read_at {
        // clock skew
        if last_read > now {
            return EngagementStatus::Sent;
        }
        if last_read.date_naive() == now.date_naive() {
            return EngagementStatus::ReadToday;
        }

        let days = (now - last_read).num_days();
        if days < RECENT_DAYS {
            return EngagementStatus::ReadRecent;
        }
        if days > OLD_DAYS {
            return EngagementStatus::ReadOld;
        }

        if stats.sent_count >= ENGAGED_MIN_SENT && engagement_rate(stats) >= ENGAGED_MIN_RATE {
            return EngagementStatus::Engaged;
        }
    }

    EngagementStatus::ReadRecent
}

/// Engagement view of one contact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactEngagement {
    pub phone: String,
    pub status: EngagementStatus,
    pub engagement_rate: f64,
    pub stats: Option<ContactAnalytics>,
}

/// Number of contacts per engagement status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngagementSummary {
    pub total: u64,
    pub new: u64,
    pub sent: u64,
    pub read_today: u64,
    pub read_recent: u64,
    pub read_old: u64,
    pub engaged: u64,
}

impl EngagementSummary {
    fn add(&mut self, status: EngagementStatus) {
        self.total += 1;
        match status {
            EngagementStatus::New => self.new += 1,
            EngagementStatus::Sent => self.sent += 1,
            EngagementStatus::ReadToday => self.read_today += 1,
            EngagementStatus::ReadRecent => self.read_recent += 1,
            EngagementStatus::ReadOld => self.read_old += 1,
            EngagementStatus::Engaged => self.engaged += 1,
        }
    }
}

/// Per-contact send/read tracking
pub struct AnalyticsEngine {
    repo: Arc<dyn ContactAnalyticsRepository>,
}

impl AnalyticsEngine {
    pub fn new(repo: Arc<dyn ContactAnalyticsRepository>) -> Self {
        Self { repo }
    }

    /// Record a successful send, creating the contact record if needed
    pub async fn track_message_sent(&self, phone: &str) {
        let phone = normalize_phone(phone);
        if phone.is_empty() {
            debug!("Skipping send tracking for empty phone");
            return;
        }

        if let Err(e) = self.repo.record_sent(&phone, Utc::now()).await {
            warn!(phone = %phone, "Failed to track sent message: {}", e);
        }
    }

    /// Record a read acknowledgment. Returns whether a record was updated.
    pub async fn track_message_read(&self, phone: &str) -> bool {
        let phone = normalize_phone(phone);
        if phone.is_empty() {
            return false;
        }

        match self.repo.record_read(&phone, Utc::now()).await {
            Ok(0) => {
                debug!(phone = %phone, "Discarding read for untracked contact");
                false
            }
            Ok(_) => true,
            Err(e) => {
                warn!(phone = %phone, "Failed to track read: {}", e);
                false
            }
        }
    }

    /// Record a batch of read acknowledgments.
    ///
    /// The batch is applied in one transaction; if that fails every phone
    /// is retried individually. Returns the number of records updated.
    pub async fn track_batch_read(&self, phones: &[String]) -> u64 {
        let phones: Vec<String> = phones
            .iter()
            .map(|p| normalize_phone(p))
            .filter(|p| !p.is_empty())
            .collect();

        if phones.is_empty() {
            return 0;
        }

        let now = Utc::now();
        match self.repo.record_reads(&phones, now).await {
            Ok(updated) => updated,
            Err(e) => {
                warn!(
                    "Batch read tracking failed for {} phones, falling back to single updates: {}",
                    phones.len(),
                    e
                );

                let mut updated = 0;
                for phone in &phones {
                    match self.repo.record_read(phone, now).await {
                        Ok(n) => updated += n,
                        Err(e) => warn!(phone = %phone, "Failed to track read: {}", e),
                    }
                }
                updated
            }
        }
    }

    /// Current engagement of a contact
    pub async fn contact_engagement(&self, phone: &str) -> Result<ContactEngagement> {
        let phone = normalize_phone(phone);
        let stats = self.repo.get(&phone).await?;

        Ok(ContactEngagement {
            status: classify(stats.as_ref(), Utc::now()),
            engagement_rate: stats.as_ref().map(engagement_rate).unwrap_or(0.0),
            phone,
            stats,
        })
    }

    /// Count tracked contacts per engagement status
    pub async fn engagement_summary(&self) -> Result<EngagementSummary> {
        let now = Utc::now();
        let mut summary = EngagementSummary::default();
        for stats in self.repo.list().await? {
            summary.add(classify(Some(&stats), now));
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryAnalytics;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn stats(sent: i64, read: i64, last_read: Option<DateTime<Utc>>) -> ContactAnalytics {
        ContactAnalytics {
            phone: "5511999".to_string(),
            sent_count: sent,
            read_count: read,
            last_sent_at: Some(now() - Duration::days(60)),
            last_read_at: last_read,
        }
    }

    #[test]
    fn test_classify_new() {
        assert_eq!(classify(None, now()), EngagementStatus::New);
        assert_eq!(classify(Some(&stats(0, 0, None)), now()), EngagementStatus::New);
    }

    #[test]
    fn test_classify_sent_without_reads() {
        assert_eq!(classify(Some(&stats(1, 0, None)), now()), EngagementStatus::Sent);
    }

    #[test]
    fn test_classify_future_read_is_sent() {
        let s = stats(2, 1, Some(now() + Duration::hours(2)));
        assert_eq!(classify(Some(&s), now()), EngagementStatus::Sent);
    }

    #[test]
    fn test_classify_read_today() {
        let s = stats(5, 4, Some(now()));
        assert_eq!(classify(Some(&s), now()), EngagementStatus::ReadToday);

        let earlier = stats(5, 4, Some(now() - Duration::hours(11)));
        assert_eq!(classify(Some(&earlier), now()), EngagementStatus::ReadToday);
    }

    #[test]
    fn test_classify_read_yesterday_is_recent() {
        let s = stats(5, 1, Some(now() - Duration::hours(13)));
        assert_eq!(classify(Some(&s), now()), EngagementStatus::ReadRecent);
    }

    #[test]
    fn test_classify_recent() {
        let s = stats(10, 9, Some(now() - Duration::days(6)));
        assert_eq!(classify(Some(&s), now()), EngagementStatus::ReadRecent);
    }

    #[test]
    fn test_classify_engaged_between_recent_and_old() {
        let s = stats(3, 2, Some(now() - Duration::days(10)));
        assert!(engagement_rate(&s) >= 0.6);
        assert_eq!(classify(Some(&s), now()), EngagementStatus::Engaged);

        let boundary = stats(5, 3, Some(now() - Duration::days(30)));
        assert_eq!(classify(Some(&boundary), now()), EngagementStatus::Engaged);
    }

    #[test]
    fn test_classify_low_rate_in_window_falls_back_to_recent() {
        let low_rate = stats(10, 2, Some(now() - Duration::days(20)));
        assert_eq!(classify(Some(&low_rate), now()), EngagementStatus::ReadRecent);

        let few_sends = stats(2, 2, Some(now() - Duration::days(20)));
        assert_eq!(classify(Some(&few_sends), now()), EngagementStatus::ReadRecent);
    }

    #[test]
    fn test_classify_old() {
        let s = stats(10, 1, Some(now() - Duration::days(45)));
        assert_eq!(classify(Some(&s), now()), EngagementStatus::ReadOld);

        let engaged_but_old = stats(10, 10, Some(now() - Duration::days(31)));
        assert_eq!(classify(Some(&engaged_but_old), now()), EngagementStatus::ReadOld);
    }

    #[test]
    fn test_classify_reads_without_timestamp() {
        let s = stats(5, 5, None);
        assert_eq!(classify(Some(&s), now()), EngagementStatus::ReadRecent);
    }

    #[test]
    fn test_engagement_rate() {
        assert_eq!(engagement_rate(&stats(0, 0, None)), 0.0);
        assert_eq!(engagement_rate(&stats(4, 1, None)), 0.25);
    }

    #[tokio::test]
    async fn test_read_for_unknown_phone_is_discarded() {
        let repo = Arc::new(InMemoryAnalytics::default());
        let engine = AnalyticsEngine::new(repo.clone());

        assert!(!engine.track_message_read("unknown-phone 123").await);
        assert!(repo.get("123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_send_then_read() {
        let repo = Arc::new(InMemoryAnalytics::default());
        let engine = AnalyticsEngine::new(repo.clone());

        engine.track_message_sent("+55 11 999").await;
        assert!(engine.track_message_read("5511999").await);

        let engagement = engine.contact_engagement("55-11-999").await.unwrap();
        assert_eq!(engagement.phone, "5511999");
        assert_eq!(engagement.status, EngagementStatus::ReadToday);
        assert_eq!(engagement.engagement_rate, 1.0);
    }

    #[tokio::test]
    async fn test_batch_read_falls_back_to_single_updates() {
        let repo = Arc::new(InMemoryAnalytics::default());
        let engine = AnalyticsEngine::new(repo.clone());
        engine.track_message_sent("1").await;
        engine.track_message_sent("2").await;

        repo.fail_batch_reads(true);
        let phones = vec!["1".to_string(), "2".to_string(), "3".to_string()];
        assert_eq!(engine.track_batch_read(&phones).await, 2);

        assert_eq!(repo.get("1").await.unwrap().unwrap().read_count, 1);
        assert!(repo.get("3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_engagement_summary() {
        let repo = Arc::new(InMemoryAnalytics::default());
        let engine = AnalyticsEngine::new(repo.clone());
        engine.track_message_sent("1").await;
        engine.track_message_sent("2").await;
        engine.track_message_read("2").await;

        let summary = engine.engagement_summary().await.unwrap();
        assert_eq!(
            summary,
            EngagementSummary {
                total: 2,
                sent: 1,
                read_today: 1,
                ..Default::default()
            }
        );
    }
}
