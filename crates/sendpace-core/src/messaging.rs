//! Messaging client boundary
//!
//! The platform automation itself lives in a separate bridge process. The
//! engine only needs to send one message and to ask whether the bridge has
//! a live session.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use sendpace_common::config::MessagingConfig;
use sendpace_common::types::MediaPayload;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Messaging errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessagingError {
    #[error("Phone number {0} is not registered on the platform")]
    NotRegistered(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Send rejected: {0}")]
    Rejected(String),
}

impl From<MessagingError> for sendpace_common::Error {
    fn from(e: MessagingError) -> Self {
        sendpace_common::Error::Messaging(e.to_string())
    }
}

/// Outbound messaging boundary
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Send a single message. At least one of `body` and `media` is set.
    async fn send(
        &self,
        phone: &str,
        body: Option<&str>,
        media: Option<&MediaPayload>,
    ) -> Result<(), MessagingError>;

    /// Whether the client currently has a usable session
    async fn is_ready(&self) -> bool;
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    phone: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<&'a MediaPayload>,
}

#[derive(Debug, Default, Deserialize)]
struct SendResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    ready: bool,
}

/// HTTP client for the automation bridge
///
/// `POST {base_url}/send` delivers a message and `GET {base_url}/status`
/// reports session readiness.
pub struct HttpMessagingClient {
    base_url: String,
    client: Client,
}

impl HttpMessagingClient {
    /// Create a new bridge client
    pub fn new(config: &MessagingConfig) -> sendpace_common::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                sendpace_common::Error::Config(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl MessagingClient for HttpMessagingClient {
    async fn send(
        &self,
        phone: &str,
        body: Option<&str>,
        media: Option<&MediaPayload>,
    ) -> Result<(), MessagingError> {
        let request = SendRequest {
            phone,
            message: body,
            media,
        };

        let response = self
            .client
            .post(self.url("/send"))
            .json(&request)
            .send()
            .await
            .map_err(|e| MessagingError::Transport(e.to_string()))?;

        let status = response.status();
        let payload: SendResponse = response.json().await.unwrap_or_else(|e| {
            debug!("Bridge returned a non-JSON send response: {}", e);
            SendResponse::default()
        });

        if status == StatusCode::NOT_FOUND {
            return Err(MessagingError::NotRegistered(phone.to_string()));
        }

        if !status.is_success() {
            return Err(MessagingError::Rejected(
                payload
                    .error
                    .unwrap_or_else(|| format!("bridge responded with {}", status)),
            ));
        }

        if !payload.success {
            return Err(MessagingError::Rejected(
                payload
                    .error
                    .unwrap_or_else(|| "bridge reported failure".to_string()),
            ));
        }

        Ok(())
    }

    async fn is_ready(&self) -> bool {
        let response = match self.client.get(self.url("/status")).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Messaging bridge status check failed: {}", e);
                return false;
            }
        };

        if !response.status().is_success() {
            warn!("Messaging bridge status returned {}", response.status());
            return false;
        }

        match response.json::<StatusResponse>().await {
            Ok(status) => status.ready,
            Err(e) => {
                warn!("Invalid messaging bridge status response: {}", e);
                false
            }
        }
    }
}
