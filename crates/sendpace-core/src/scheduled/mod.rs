//! Scheduled sending - batch creation, the periodic processor and stale
//! batch recovery

mod batches;
mod processor;
mod stale;

pub use batches::{BatchService, ScheduleRequest};
pub use processor::{ScheduledBatchProcessor, SkipReason, TickOutcome, TickSummary};
pub use stale::{ResolveOutcome, StaleBatchDetector, StaleResolution};
