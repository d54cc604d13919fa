//! Shared application state

use sendpace_core::{
    AnalyticsEngine, BatchService, CampaignLifecycle, DispatchController, StaleBatchDetector,
};
use sendpace_storage::DatabasePool;
use std::sync::Arc;

/// State shared by all handlers
pub struct AppState {
    pub db_pool: DatabasePool,
    pub dispatch: Arc<DispatchController>,
    pub batches: Arc<BatchService>,
    pub stale: Arc<StaleBatchDetector>,
    pub campaigns: Arc<CampaignLifecycle>,
    pub analytics: Arc<AnalyticsEngine>,
}
