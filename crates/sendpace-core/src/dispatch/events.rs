//! Capped dispatch log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Log entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Success,
    Failure,
    Info,
}

/// A human-readable dispatch event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub kind: LogKind,
    pub message: String,
}

/// Most recent dispatch events, oldest first. Older entries are evicted
/// once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct DispatchLog {
    entries: Arc<RwLock<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl DispatchLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub async fn push(&self, kind: LogKind, message: impl Into<String>) {
        let mut entries = self.entries.write().await;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(LogEntry {
            at: Utc::now(),
            kind,
            message: message.into(),
        });
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.push(LogKind::Info, message).await;
    }

    pub async fn success(&self, message: impl Into<String>) {
        self.push(LogKind::Success, message).await;
    }

    pub async fn failure(&self, message: impl Into<String>) {
        self.push(LogKind::Failure, message).await;
    }

    pub async fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.read().await.iter().cloned().collect()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
