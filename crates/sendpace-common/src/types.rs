//! Common types for SendPace

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for campaigns
pub type CampaignId = Uuid;

/// Unique identifier for scheduled messages
pub type ScheduledMessageId = Uuid;

/// Groups the scheduled messages created by one scheduling request
pub type BatchId = Uuid;

/// Unique identifier for templates
pub type TemplateId = Uuid;

/// Timestamp wrapper
pub type Timestamp = DateTime<Utc>;

/// A contact to send to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub phone: String,
}

impl Recipient {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
        }
    }
}

/// Media attached to an outbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPayload {
    /// MIME type, e.g. `image/jpeg`
    pub mimetype: String,
    /// Base64 encoded content
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl MediaPayload {
    /// Parse a media payload stored as JSON text.
    ///
    /// Blank or malformed input yields `None`; callers treat that as "no media".
    pub fn from_json(raw: Option<&str>) -> Option<Self> {
        let raw = raw?.trim();
        if raw.is_empty() || raw == "null" {
            return None;
        }
        match serde_json::from_str(raw) {
            Ok(media) => Some(media),
            Err(e) => {
                tracing::warn!("Ignoring malformed media payload: {}", e);
                None
            }
        }
    }
}

/// Normalize a phone number to digits only.
///
/// Separators and a leading `+` are dropped so the same contact always maps
/// to the same analytics row.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}
