//! Retry queue client
//!
//! Thin ownership of the broker handle for the retry queue: LPUSH
//! publishes the JSON envelope, BRPOP consumes it. Popping the element is
//! the broker-side acknowledgement, so a message is gone from the broker
//! the moment it is delivered. A crash between delivery and a terminal
//! outcome loses it.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use thiserror::Error;

use shared::RetryMessage;

/// Queue operation errors
#[derive(Debug, Error)]
pub enum QueueError {
    /// Broker connection or operation error
    #[error("Broker error: {0}")]
    Broker(#[from] redis::RedisError),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Abstract retry queue interface for testability
#[async_trait]
pub trait RetryQueue: Send + Sync {
    /// Publish a retry message
    ///
    /// Best-effort from the caller's point of view: callers log and drop
    /// the message on error rather than failing their own operation.
    async fn publish(&self, message: &RetryMessage) -> QueueResult<()>;

    /// Block up to `timeout_secs` for the next message
    ///
    /// Returns `None` on timeout and also when a delivered element could
    /// not be decoded; such elements are consumed and dropped.
    async fn consume(&self, timeout_secs: u64) -> QueueResult<Option<RetryMessage>>;

    /// Get current queue length
    async fn len(&self) -> QueueResult<u64>;
}

/// Decode a wire-format envelope, dropping anything unparseable
///
/// The queue carries only `RetryMessage` envelopes; an element that does
/// not decode (foreign producer, corrupted payload) is logged and
/// discarded so it cannot wedge the consume loop.
fn decode(json: &str) -> Option<RetryMessage> {
    match serde_json::from_str::<RetryMessage>(json) {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::warn!(error = %e, "Dropping undecodable retry message");
            None
        }
    }
}

/// Redis-backed retry queue
///
/// The multiplexed connection is cloned per operation, so one client is
/// safe for concurrent publishes from the dispatcher and any number of
/// retry workers.
#[derive(Clone)]
pub struct RedisRetryQueue {
    conn: MultiplexedConnection,
    queue_name: String,
}

impl RedisRetryQueue {
    /// Create a new retry queue client on an established connection
    pub fn new(conn: MultiplexedConnection, queue_name: impl Into<String>) -> Self {
        Self {
            conn,
            queue_name: queue_name.into(),
        }
    }
}

#[async_trait]
impl RetryQueue for RedisRetryQueue {
    async fn publish(&self, message: &RetryMessage) -> QueueResult<()> {
        let json = serde_json::to_string(message)?;

        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(&self.queue_name, &json).await?;

        tracing::debug!(
            message_id = %message.id,
            payment_type = %message.payment_type,
            cycle = message.cycle,
            "Published retry message"
        );

        Ok(())
    }

    async fn consume(&self, timeout_secs: u64) -> QueueResult<Option<RetryMessage>> {
        let mut conn = self.conn.clone();

        // BRPOP blocks until an element is available or timeout.
        // Returns a (queue_name, value) tuple.
        let result: Option<(String, String)> =
            conn.brpop(&self.queue_name, timeout_secs as f64).await?;

        match result {
            Some((_, json)) => Ok(decode(&json)),
            None => Ok(None),
        }
    }

    async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.conn.clone();
        let len: u64 = conn.llen(&self.queue_name).await?;
        Ok(len)
    }
}

/// In-memory retry queue for tests
///
/// Stores wire-format JSON so `consume` exercises the same decode path
/// as the broker-backed client.
#[derive(Default)]
pub struct InMemoryRetryQueue {
    items: Mutex<VecDeque<String>>,
}

impl InMemoryRetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a raw element, bypassing envelope serialization
    pub fn push_raw(&self, json: impl Into<String>) {
        self.items.lock().unwrap().push_back(json.into());
    }

    /// Decode all queued envelopes (for test inspection)
    pub fn messages(&self) -> Vec<RetryMessage> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .filter_map(|json| serde_json::from_str(json).ok())
            .collect()
    }
}

#[async_trait]
impl RetryQueue for InMemoryRetryQueue {
    async fn publish(&self, message: &RetryMessage) -> QueueResult<()> {
        let json = serde_json::to_string(message)?;
        self.items.lock().unwrap().push_back(json);
        Ok(())
    }

    async fn consume(&self, _timeout_secs: u64) -> QueueResult<Option<RetryMessage>> {
        let popped = self.items.lock().unwrap().pop_front();
        match popped {
            Some(json) => Ok(decode(&json)),
            None => {
                // Simulate a short blocking pop so poller tests do not spin
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                Ok(None)
            }
        }
    }

    async fn len(&self) -> QueueResult<u64> {
        Ok(self.items.lock().unwrap().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use shared::PaymentType;

    // Mock implementation of RetryQueue for components that depend on it
    mock! {
        pub RetryQueue {}

        #[async_trait]
        impl RetryQueue for RetryQueue {
            async fn publish(&self, message: &RetryMessage) -> QueueResult<()>;
            async fn consume(&self, timeout_secs: u64) -> QueueResult<Option<RetryMessage>>;
            async fn len(&self) -> QueueResult<u64>;
        }
    }

    #[tokio::test]
    async fn test_mock_retry_queue() {
        let mut mock = MockRetryQueue::new();

        mock.expect_publish().times(1).returning(|_| Ok(()));
        mock.expect_len().times(1).returning(|| Ok(1));

        let message = RetryMessage::new(PaymentType::Card, "{}");
        mock.publish(&message).await.unwrap();
        assert_eq!(mock.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_in_memory_publish_and_consume() {
        let queue = InMemoryRetryQueue::new();
        let message = RetryMessage::new(PaymentType::Card, r#"{"payment_method":"card"}"#);

        queue.publish(&message).await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 1);

        let consumed = queue.consume(1).await.unwrap().unwrap();
        assert_eq!(consumed.id, message.id);
        assert_eq!(consumed.payload, message.payload);
        assert_eq!(queue.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_consume_preserves_fifo_order() {
        let queue = InMemoryRetryQueue::new();
        let first = RetryMessage::new(PaymentType::Card, r#"{"n":1}"#);
        let second = RetryMessage::new(PaymentType::Mobile, r#"{"n":2}"#);

        queue.publish(&first).await.unwrap();
        queue.publish(&second).await.unwrap();

        assert_eq!(queue.consume(1).await.unwrap().unwrap().id, first.id);
        assert_eq!(queue.consume(1).await.unwrap().unwrap().id, second.id);
    }

    #[tokio::test]
    async fn test_consume_empty_returns_none() {
        let queue = InMemoryRetryQueue::new();
        assert!(queue.consume(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_undecodable_message_is_consumed_and_dropped() {
        let queue = InMemoryRetryQueue::new();
        queue.push_raw(r#"{"foo":"bar"}"#);

        // The element is delivered but does not decode: dropped silently
        assert!(queue.consume(1).await.unwrap().is_none());
        assert_eq!(queue.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_payload_survives_wire_format_byte_for_byte() {
        let queue = InMemoryRetryQueue::new();
        let payload = r#"{"payment_method":"card","amount":12.50,"note":"café"}"#;
        let message = RetryMessage::new(PaymentType::Card, payload);

        queue.publish(&message).await.unwrap();
        let consumed = queue.consume(1).await.unwrap().unwrap();

        assert_eq!(consumed.payload, payload);
    }
}
