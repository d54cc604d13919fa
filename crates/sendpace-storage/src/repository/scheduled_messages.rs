//! Scheduled message repository

use crate::db::DatabasePool;
use crate::models::{CreateScheduledMessage, ScheduledBatch, ScheduledMessage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sendpace_common::types::{BatchId, ScheduledMessageId};
use sendpace_common::{Error, Result};
use uuid::Uuid;

/// Scheduled message repository trait
#[async_trait]
pub trait ScheduledMessageRepository: Send + Sync {
    /// Insert all messages of a scheduling request in one transaction
    async fn create_batch(&self, messages: Vec<CreateScheduledMessage>) -> Result<u64>;

    async fn get(&self, id: ScheduledMessageId) -> Result<Option<ScheduledMessage>>;

    async fn list_by_batch(&self, batch_id: BatchId) -> Result<Vec<ScheduledMessage>>;

    /// Pending messages with `not_before <= scheduled_for <= now`, oldest first
    async fn get_due(
        &self,
        now: DateTime<Utc>,
        not_before: DateTime<Utc>,
    ) -> Result<Vec<ScheduledMessage>>;

    /// `pending -> sent`; returns false if the message was no longer pending
    async fn mark_sent(&self, id: ScheduledMessageId, at: DateTime<Utc>) -> Result<bool>;

    /// `pending -> failed`; returns false if the message was no longer pending
    async fn mark_failed(
        &self,
        id: ScheduledMessageId,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Batches with at least one pending message, earliest first
    async fn list_pending_batches(&self) -> Result<Vec<ScheduledBatch>>;

    /// Move every pending message of a batch to `scheduled_for`
    async fn reschedule_batch(&self, batch_id: BatchId, scheduled_for: DateTime<Utc>)
        -> Result<u64>;

    /// Delete every pending message of a batch
    async fn delete_pending_batch(&self, batch_id: BatchId) -> Result<u64>;
}

/// Database scheduled message repository
pub struct DbScheduledMessageRepository {
    pool: DatabasePool,
}

impl DbScheduledMessageRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScheduledMessageRepository for DbScheduledMessageRepository {
    async fn create_batch(&self, messages: Vec<CreateScheduledMessage>) -> Result<u64> {
        let mut count = 0u64;
        let now = Utc::now();
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        for input in messages {
            let result = sqlx::query(
                r#"
                INSERT INTO scheduled_messages (
                    id, contact_name, contact_phone, template_id, scheduled_for,
                    status, batch_id, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, $7)
                "#,
            )
            .bind(Uuid::now_v7())
            .bind(&input.contact_name)
            .bind(&input.contact_phone)
            .bind(input.template_id)
            .bind(input.scheduled_for)
            .bind(input.batch_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

            count += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count)
    }

    async fn get(&self, id: ScheduledMessageId) -> Result<Option<ScheduledMessage>> {
        sqlx::query_as::<_, ScheduledMessage>("SELECT * FROM scheduled_messages WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn list_by_batch(&self, batch_id: BatchId) -> Result<Vec<ScheduledMessage>> {
        sqlx::query_as::<_, ScheduledMessage>(
            "SELECT * FROM scheduled_messages WHERE batch_id = $1 ORDER BY scheduled_for ASC, id ASC",
        )
        .bind(batch_id)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn get_due(
        &self,
        now: DateTime<Utc>,
        not_before: DateTime<Utc>,
    ) -> Result<Vec<ScheduledMessage>> {
        sqlx::query_as::<_, ScheduledMessage>(
            r#"
            SELECT * FROM scheduled_messages
            WHERE status = 'pending'
              AND scheduled_for <= $1
              AND scheduled_for >= $2
            ORDER BY scheduled_for ASC, id ASC
            "#,
        )
        .bind(now)
        .bind(not_before)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn mark_sent(&self, id: ScheduledMessageId, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_messages SET
                status = 'sent',
                sent_at = $2,
                updated_at = $2
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(
        &self,
        id: ScheduledMessageId,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_messages SET
                status = 'failed',
                last_error = $2,
                updated_at = $3
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(at)
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_pending_batches(&self) -> Result<Vec<ScheduledBatch>> {
        sqlx::query_as::<_, ScheduledBatch>(
            r#"
            SELECT
                batch_id,
                MIN(template_id) AS template_id,
                MIN(scheduled_for) AS scheduled_for,
                COUNT(*) AS pending_count
            FROM scheduled_messages
            WHERE status = 'pending'
            GROUP BY batch_id
            ORDER BY scheduled_for ASC
            "#,
        )
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn reschedule_batch(
        &self,
        batch_id: BatchId,
        scheduled_for: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_messages SET
                scheduled_for = $2,
                updated_at = $3
            WHERE batch_id = $1 AND status = 'pending'
            "#,
        )
        .bind(batch_id)
        .bind(scheduled_for)
        .bind(Utc::now())
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn delete_pending_batch(&self, batch_id: BatchId) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM scheduled_messages WHERE batch_id = $1 AND status = 'pending'",
        )
        .bind(batch_id)
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
