//! Report configuration repository

use crate::db::DatabasePool;
use crate::models::{ReportConfig, ReportRecipient};
use async_trait::async_trait;
use chrono::Utc;
use sendpace_common::{Error, Result};
use uuid::Uuid;

/// The configuration is a single row with this id
const CONFIG_ROW_ID: i64 = 1;

/// Report configuration repository trait
#[async_trait]
pub trait ReportConfigRepository: Send + Sync {
    async fn get_config(&self) -> Result<Option<ReportConfig>>;

    /// Insert the default configuration if none exists and return the current one
    async fn ensure_default(&self) -> Result<ReportConfig>;

    async fn update_config(&self, send_immediate: bool, daily_enabled: bool)
        -> Result<ReportConfig>;

    async fn add_recipient(&self, name: &str, phone: &str) -> Result<ReportRecipient>;

    async fn list_active_recipients(&self) -> Result<Vec<ReportRecipient>>;
}

/// Database report configuration repository
pub struct DbReportConfigRepository {
    pool: DatabasePool,
}

impl DbReportConfigRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportConfigRepository for DbReportConfigRepository {
    async fn get_config(&self) -> Result<Option<ReportConfig>> {
        sqlx::query_as::<_, ReportConfig>("SELECT * FROM report_configs WHERE id = $1")
            .bind(CONFIG_ROW_ID)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn ensure_default(&self) -> Result<ReportConfig> {
        sqlx::query(
            r#"
            INSERT INTO report_configs (id, send_immediate, daily_enabled, updated_at)
            VALUES ($1, 1, 0, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(CONFIG_ROW_ID)
        .bind(Utc::now())
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        self.get_config()
            .await?
            .ok_or_else(|| Error::Internal("Report configuration missing".to_string()))
    }

    async fn update_config(
        &self,
        send_immediate: bool,
        daily_enabled: bool,
    ) -> Result<ReportConfig> {
        self.ensure_default().await?;

        sqlx::query(
            r#"
            UPDATE report_configs SET
                send_immediate = $2,
                daily_enabled = $3,
                updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(CONFIG_ROW_ID)
        .bind(send_immediate)
        .bind(daily_enabled)
        .bind(Utc::now())
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        self.get_config()
            .await?
            .ok_or_else(|| Error::Internal("Report configuration missing".to_string()))
    }

    async fn add_recipient(&self, name: &str, phone: &str) -> Result<ReportRecipient> {
        let id = Uuid::now_v7();

        sqlx::query_as::<_, ReportRecipient>(
            r#"
            INSERT INTO report_recipients (id, name, phone, active, created_at)
            VALUES ($1, $2, $3, 1, $4)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(phone)
        .bind(Utc::now())
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn list_active_recipients(&self) -> Result<Vec<ReportRecipient>> {
        sqlx::query_as::<_, ReportRecipient>(
            "SELECT * FROM report_recipients WHERE active = 1 ORDER BY created_at ASC",
        )
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }
}
