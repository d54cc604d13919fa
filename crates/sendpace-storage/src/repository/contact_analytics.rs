//! Contact analytics repository
//!
//! Sends upsert a row; reads only ever update an existing one.

use crate::db::DatabasePool;
use crate::models::ContactAnalytics;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sendpace_common::{Error, Result};

/// Contact analytics repository trait
#[async_trait]
pub trait ContactAnalyticsRepository: Send + Sync {
    /// Increment `sent_count`, creating the row when absent
    async fn record_sent(&self, phone: &str, at: DateTime<Utc>) -> Result<()>;

    /// Increment `read_count` for an existing row; returns rows updated
    async fn record_read(&self, phone: &str, at: DateTime<Utc>) -> Result<u64>;

    /// Same as [`record_read`](Self::record_read) for many phones in one transaction
    async fn record_reads(&self, phones: &[String], at: DateTime<Utc>) -> Result<u64>;

    async fn get(&self, phone: &str) -> Result<Option<ContactAnalytics>>;

    async fn list(&self) -> Result<Vec<ContactAnalytics>>;
}

/// Database contact analytics repository
pub struct DbContactAnalyticsRepository {
    pool: DatabasePool,
}

impl DbContactAnalyticsRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

const RECORD_READ_SQL: &str = r#"
    UPDATE contact_analytics SET
        read_count = read_count + 1,
        last_read_at = $2
    WHERE phone = $1
"#;

#[async_trait]
impl ContactAnalyticsRepository for DbContactAnalyticsRepository {
    async fn record_sent(&self, phone: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO contact_analytics (phone, sent_count, read_count, last_sent_at)
            VALUES ($1, 1, 0, $2)
            ON CONFLICT (phone) DO UPDATE SET
                sent_count = contact_analytics.sent_count + 1,
                last_sent_at = excluded.last_sent_at
            "#,
        )
        .bind(phone)
        .bind(at)
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn record_read(&self, phone: &str, at: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(RECORD_READ_SQL)
            .bind(phone)
            .bind(at)
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn record_reads(&self, phones: &[String], at: DateTime<Utc>) -> Result<u64> {
        let mut updated = 0u64;
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        for phone in phones {
            let result = sqlx::query(RECORD_READ_SQL)
                .bind(phone)
                .bind(at)
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::Database(e.to_string()))?;
            updated += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(updated)
    }

    async fn get(&self, phone: &str) -> Result<Option<ContactAnalytics>> {
        sqlx::query_as::<_, ContactAnalytics>("SELECT * FROM contact_analytics WHERE phone = $1")
            .bind(phone)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn list(&self) -> Result<Vec<ContactAnalytics>> {
        sqlx::query_as::<_, ContactAnalytics>("SELECT * FROM contact_analytics ORDER BY phone ASC")
            .fetch_all(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }
}
