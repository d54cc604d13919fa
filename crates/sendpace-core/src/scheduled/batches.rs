//! Scheduling requests
//!
//! A scheduling request turns a contact list into one batch of pending
//! messages sharing a batch id.

use chrono::{DateTime, Utc};
use sendpace_common::types::{normalize_phone, BatchId, Recipient, TemplateId};
use sendpace_common::{Error, Result};
use sendpace_storage::models::{CreateScheduledMessage, ScheduledBatch};
use sendpace_storage::repository::{ScheduledMessageRepository, TemplateRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Request to schedule a template for a contact list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub template_id: TemplateId,
    pub scheduled_for: DateTime<Utc>,
    pub recipients: Vec<Recipient>,
}

/// Creates, cancels and moves scheduled batches
pub struct BatchService {
    messages: Arc<dyn ScheduledMessageRepository>,
    templates: Arc<dyn TemplateRepository>,
}

impl BatchService {
    pub fn new(
        messages: Arc<dyn ScheduledMessageRepository>,
        templates: Arc<dyn TemplateRepository>,
    ) -> Self {
        Self {
            messages,
            templates,
        }
    }

    /// Create one pending message per recipient under a new batch id
    pub async fn schedule(&self, request: ScheduleRequest) -> Result<ScheduledBatch> {
        if request.recipients.is_empty() {
            return Err(Error::Validation(
                "At least one recipient is required".to_string(),
            ));
        }

        if self.templates.get(request.template_id).await?.is_none() {
            return Err(Error::NotFound(format!(
                "Template {} not found",
                request.template_id
            )));
        }

        let batch_id = Uuid::now_v7();
        let rows: Vec<CreateScheduledMessage> = request
            .recipients
            .iter()
            .map(|r| CreateScheduledMessage {
                contact_name: r.name.clone(),
                contact_phone: stored_phone(&r.phone),
                template_id: request.template_id,
                scheduled_for: request.scheduled_for,
                batch_id,
            })
            .collect();

        let created = self.messages.create_batch(rows).await?;
        info!(
            batch_id = %batch_id,
            "Scheduled {} messages for {}", created, request.scheduled_for
        );

        Ok(ScheduledBatch {
            batch_id,
            template_id: request.template_id,
            scheduled_for: request.scheduled_for,
            pending_count: created as i64,
        })
    }

    /// Batches that still have pending messages, earliest first
    pub async fn list_pending(&self) -> Result<Vec<ScheduledBatch>> {
        self.messages.list_pending_batches().await
    }

    /// Delete the pending messages of a batch
    pub async fn cancel(&self, batch_id: BatchId) -> Result<u64> {
        let deleted = self.messages.delete_pending_batch(batch_id).await?;
        if deleted == 0 {
            return Err(Error::NotFound(format!(
                "No pending messages in batch {}",
                batch_id
            )));
        }

        info!(batch_id = %batch_id, "Cancelled {} scheduled messages", deleted);
        Ok(deleted)
    }

    /// Move the pending messages of a batch to `scheduled_for`
    pub async fn reschedule(&self, batch_id: BatchId, scheduled_for: DateTime<Utc>) -> Result<u64> {
        let updated = self
            .messages
            .reschedule_batch(batch_id, scheduled_for)
            .await?;
        if updated == 0 {
            return Err(Error::NotFound(format!(
                "No pending messages in batch {}",
                batch_id
            )));
        }

        info!(batch_id = %batch_id, "Rescheduled {} messages to {}", updated, scheduled_for);
        Ok(updated)
    }
}

/// Digits only; input without digits is kept verbatim so the processor
/// can record it as a failed message.
fn stored_phone(phone: &str) -> String {
    match normalize_phone(phone) {
        digits if digits.is_empty() => phone.trim().to_string(),
        digits => digits,
    }
}
