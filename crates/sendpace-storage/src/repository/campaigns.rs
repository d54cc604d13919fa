//! Campaign repository

use crate::db::DatabasePool;
use crate::models::{Campaign, CampaignCounts, CreateCampaign};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sendpace_common::types::CampaignId;
use sendpace_common::{Error, Result};
use uuid::Uuid;

/// Campaign repository trait
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    async fn create(&self, input: CreateCampaign) -> Result<Campaign>;
    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>>;
    async fn list_recent(&self, limit: i64) -> Result<Vec<Campaign>>;

    /// Persist final counts and set `completed_at`.
    ///
    /// Returns the updated campaign, or `None` when the campaign does not
    /// exist or was already completed.
    async fn complete(
        &self,
        id: CampaignId,
        counts: CampaignCounts,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<Campaign>>;

    /// Atomically flip `immediate_report_sent` from false to true.
    ///
    /// Returns `true` only for the caller that performed the flip.
    async fn claim_immediate_report(&self, id: CampaignId) -> Result<bool>;

    /// Undo a claim after the report could not be delivered
    async fn release_immediate_report(&self, id: CampaignId) -> Result<()>;
}

/// Database campaign repository
pub struct DbCampaignRepository {
    pool: DatabasePool,
}

impl DbCampaignRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignRepository for DbCampaignRepository {
    async fn create(&self, input: CreateCampaign) -> Result<Campaign> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO campaigns (id, name, total_contacts, sent_count, failed_count, started_at, immediate_report_sent)
            VALUES ($1, $2, $3, 0, 0, $4, 0)
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.total_contacts)
        .bind(now)
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        self.get(id)
            .await?
            .ok_or_else(|| Error::Internal("Failed to create campaign".to_string()))
    }

    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>> {
        sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Campaign>> {
        sqlx::query_as::<_, Campaign>(
            "SELECT * FROM campaigns ORDER BY started_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn complete(
        &self,
        id: CampaignId,
        counts: CampaignCounts,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<Campaign>> {
        let result = sqlx::query(
            r#"
            UPDATE campaigns SET
                sent_count = $2,
                failed_count = $3,
                completed_at = $4
            WHERE id = $1 AND completed_at IS NULL
            "#,
        )
        .bind(id)
        .bind(counts.sent)
        .bind(counts.failed)
        .bind(completed_at)
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get(id).await
    }

    async fn claim_immediate_report(&self, id: CampaignId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE campaigns SET immediate_report_sent = 1 WHERE id = $1 AND immediate_report_sent = 0",
        )
        .bind(id)
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn release_immediate_report(&self, id: CampaignId) -> Result<()> {
        sqlx::query("UPDATE campaigns SET immediate_report_sent = 0 WHERE id = $1")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }
}
