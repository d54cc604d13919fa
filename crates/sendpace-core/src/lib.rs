//! SendPace Core - dispatch and recovery engine
//!
//! This crate provides the paced sequential dispatch queue, the scheduled
//! batch processor with stale batch recovery, campaign tracking and the
//! contact engagement analytics.

pub mod analytics;
pub mod campaign;
pub mod delay;
pub mod dispatch;
pub mod messaging;
pub mod reporting;
pub mod scheduled;

#[cfg(test)]
mod testing;

pub use analytics::{AnalyticsEngine, ContactEngagement, EngagementStatus, EngagementSummary};
pub use campaign::CampaignLifecycle;
pub use delay::{Pacing, SafetyDelay, FAILURE_DELAY};
pub use dispatch::{DispatchController, DispatchProgress, DispatchQueue, DispatchRequest, DispatchState};
pub use messaging::{HttpMessagingClient, MessagingClient, MessagingError};
pub use reporting::{MessagingReportService, ReportDelivery, ReportService};
pub use scheduled::{
    BatchService, ScheduleRequest, ScheduledBatchProcessor, StaleBatchDetector, StaleResolution,
    TickOutcome,
};
