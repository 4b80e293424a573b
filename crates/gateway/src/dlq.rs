//! Dead letter queue for messages that exhausted the retry policy
//!
//! A message that fails every attempt of every republish cycle is parked
//! here for manual review instead of circulating on the retry queue
//! forever.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

use shared::RetryMessage;

use crate::queue::{QueueError, QueueResult};

/// Entry in the dead letter queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqEntry {
    /// The message that exhausted its retry policy
    pub message: RetryMessage,
    /// Error message from the last failed attempt
    pub error: String,
    /// Number of completed republish cycles
    pub cycles: u32,
    /// When the message was dead-lettered
    pub failed_at: DateTime<Utc>,
}

impl DlqEntry {
    /// Create a new DLQ entry
    pub fn new(message: RetryMessage, error: String, cycles: u32) -> Self {
        Self {
            message,
            error,
            cycles,
            failed_at: Utc::now(),
        }
    }
}

/// Dead letter queue trait for testability
#[async_trait]
pub trait DeadLetterQueue: Send + Sync {
    /// Park a message that exhausted its retry policy
    async fn push(&self, entry: DlqEntry) -> QueueResult<()>;

    /// Get current DLQ length
    async fn len(&self) -> QueueResult<u64>;

    /// Pop the oldest entry (for reprocessing)
    async fn pop(&self) -> QueueResult<Option<DlqEntry>>;

    /// Peek at the oldest entry without removing it
    async fn peek(&self) -> QueueResult<Option<DlqEntry>>;
}

/// Redis-backed dead letter queue
#[derive(Clone)]
pub struct RedisDlq {
    conn: MultiplexedConnection,
    queue_name: String,
}

impl RedisDlq {
    /// Create a new DLQ client on an established connection
    pub fn new(conn: MultiplexedConnection, queue_name: impl Into<String>) -> Self {
        Self {
            conn,
            queue_name: queue_name.into(),
        }
    }
}

#[async_trait]
impl DeadLetterQueue for RedisDlq {
    async fn push(&self, entry: DlqEntry) -> QueueResult<()> {
        let json = serde_json::to_string(&entry)?;

        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(&self.queue_name, &json).await?;

        tracing::error!(
            message_id = %entry.message.id,
            payment_type = %entry.message.payment_type,
            cycles = entry.cycles,
            error = %entry.error,
            "Message moved to dead letter queue"
        );

        Ok(())
    }

    async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.conn.clone();
        let len: u64 = conn.llen(&self.queue_name).await?;
        Ok(len)
    }

    async fn pop(&self) -> QueueResult<Option<DlqEntry>> {
        let mut conn = self.conn.clone();
        let result: Option<String> = conn.rpop(&self.queue_name, None).await?;

        match result {
            Some(json) => {
                let entry: DlqEntry = serde_json::from_str(&json).map_err(QueueError::from)?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    async fn peek(&self) -> QueueResult<Option<DlqEntry>> {
        let mut conn = self.conn.clone();
        let result: Option<String> = conn.lindex(&self.queue_name, -1).await?;

        match result {
            Some(json) => {
                let entry: DlqEntry = serde_json::from_str(&json).map_err(QueueError::from)?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }
}

/// In-memory DLQ for tests
#[derive(Default)]
pub struct InMemoryDlq {
    entries: Mutex<Vec<DlqEntry>>,
}

impl InMemoryDlq {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all entries (for test inspection)
    pub fn entries(&self) -> Vec<DlqEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeadLetterQueue for InMemoryDlq {
    async fn push(&self, entry: DlqEntry) -> QueueResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    async fn len(&self) -> QueueResult<u64> {
        Ok(self.entries.lock().unwrap().len() as u64)
    }

    async fn pop(&self) -> QueueResult<Option<DlqEntry>> {
        let mut entries = self.entries.lock().unwrap();
        if entries.is_empty() {
            Ok(None)
        } else {
            Ok(Some(entries.remove(0)))
        }
    }

    async fn peek(&self) -> QueueResult<Option<DlqEntry>> {
        Ok(self.entries.lock().unwrap().first().cloned())
    }
}
