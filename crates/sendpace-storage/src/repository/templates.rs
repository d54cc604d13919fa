//! Template repository
//!
//! Templates are authored elsewhere; this is the read path the scheduler
//! needs plus an insert used for seeding.

use crate::db::DatabasePool;
use crate::models::{CreateTemplate, Template};
use async_trait::async_trait;
use sendpace_common::types::TemplateId;
use sendpace_common::{Error, Result};
use uuid::Uuid;

/// Template repository trait
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn create(&self, input: CreateTemplate) -> Result<Template>;
    async fn get(&self, id: TemplateId) -> Result<Option<Template>>;
}

/// Database template repository
pub struct DbTemplateRepository {
    pool: DatabasePool,
}

impl DbTemplateRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateRepository for DbTemplateRepository {
    async fn create(&self, input: CreateTemplate) -> Result<Template> {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            INSERT INTO templates (id, name, content, media, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.content)
        .bind(&input.media)
        .bind(now)
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        self.get(id)
            .await?
            .ok_or_else(|| Error::Internal("Failed to create template".to_string()))
    }

    async fn get(&self, id: TemplateId) -> Result<Option<Template>> {
        sqlx::query_as::<_, Template>("SELECT * FROM templates WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }
}
