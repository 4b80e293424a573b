//! Retry worker: bounded re-attempts for one failed payment request
//!
//! A worker owns one dequeued message. It re-issues the downstream call
//! up to `max_attempts` times with a fixed delay before each attempt. On
//! exhaustion the message is republished with a fresh attempt budget, or
//! dead-lettered once the republish cycle cap is reached.

use std::sync::Arc;
use std::time::Duration;

use shared::config::RetryConfig;
use shared::{PaymentType, RetryMessage};

use crate::dlq::{DeadLetterQueue, DlqEntry};
use crate::downstream::DownstreamClient;
use crate::queue::RetryQueue;

/// Retry policy for one worker invocation
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Downstream calls per invocation
    pub max_attempts: u32,
    /// Fixed delay before each attempt
    pub delay: Duration,
    /// Republish cycles before the message is dead-lettered
    pub max_republish_cycles: u32,
}

impl Default for RetryPolicy {
    /// Default policy: 5 attempts spaced 30s apart, 8 republish cycles
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(30),
            max_republish_cycles: 8,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: config.delay(),
            max_republish_cycles: config.max_republish_cycles,
        }
    }
}

/// Worker that re-attempts a failed payment request
pub struct RetryWorker<C, Q, D>
where
    C: DownstreamClient,
    Q: RetryQueue,
    D: DeadLetterQueue,
{
    downstream: Arc<C>,
    queue: Arc<Q>,
    dlq: Arc<D>,
    policy: RetryPolicy,
}

impl<C, Q, D> RetryWorker<C, Q, D>
where
    C: DownstreamClient + 'static,
    Q: RetryQueue + 'static,
    D: DeadLetterQueue + 'static,
{
    /// Create a new retry worker
    pub fn new(downstream: Arc<C>, queue: Arc<Q>, dlq: Arc<D>, policy: RetryPolicy) -> Self {
        Self {
            downstream,
            queue,
            dlq,
            policy,
        }
    }

    /// Run the bounded retry loop for one message
    ///
    /// Makes at most `max_attempts` downstream calls. Attempts are
    /// strictly sequential; the payload is forwarded byte-for-byte on
    /// every attempt.
    pub async fn run(&self, message: RetryMessage) {
        let mut last_error = String::from("no attempts made");

        for attempt in 1..=self.policy.max_attempts {
            tokio::time::sleep(self.policy.delay).await;

            let result = match message.payment_type {
                PaymentType::Card => {
                    self.downstream
                        .initiate_payment(message.payload.as_bytes())
                        .await
                }
                PaymentType::Mobile => {
                    self.downstream
                        .send_to_mobile(message.payload.as_bytes())
                        .await
                }
            };

            match result {
                Ok(response) if response.is_success() => {
                    tracing::info!(
                        message_id = %message.id,
                        payment_type = %message.payment_type,
                        attempt = attempt,
                        status = response.status,
                        "Retry succeeded"
                    );
                    return;
                }
                Ok(response) => {
                    last_error = format!("downstream returned status {}", response.status);
                    tracing::warn!(
                        message_id = %message.id,
                        attempt = attempt,
                        max_attempts = self.policy.max_attempts,
                        status = response.status,
                        "Retry attempt failed"
                    );
                }
                Err(e) => {
                    last_error = e.to_string();
                    tracing::warn!(
                        message_id = %message.id,
                        attempt = attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %e,
                        "Retry attempt failed"
                    );
                }
            }
        }

        self.exhausted(message, last_error).await;
    }

    /// Terminal handling once the attempt budget is spent
    ///
    /// Republishing restores the full attempt budget (the counter is not
    /// carried across cycles); the cycle number is the only state that
    /// survives.
    async fn exhausted(&self, message: RetryMessage, last_error: String) {
        let completed_cycles = message.cycle + 1;

        if completed_cycles >= self.policy.max_republish_cycles {
            let message_id = message.id.clone();
            let entry = DlqEntry::new(message, last_error, completed_cycles);
            if let Err(e) = self.dlq.push(entry).await {
                tracing::error!(
                    message_id = %message_id,
                    error = %e,
                    "Failed to dead-letter message, dropping"
                );
            }
            return;
        }

        let next = message.next_cycle();
        tracing::warn!(
            message_id = %next.id,
            cycle = next.cycle,
            max_cycles = self.policy.max_republish_cycles,
            error = %last_error,
            "Attempts exhausted, republishing"
        );
        if let Err(e) = self.queue.publish(&next).await {
            tracing::error!(
                message_id = %next.id,
                error = %e,
                "Failed to republish message, dropping"
            );
        }
    }
}

impl<C, Q, D> Clone for RetryWorker<C, Q, D>
where
    C: DownstreamClient,
    Q: RetryQueue,
    D: DeadLetterQueue,
{
    fn clone(&self) -> Self {
        Self {
            downstream: self.downstream.clone(),
            queue: self.queue.clone(),
            dlq: self.dlq.clone(),
            policy: self.policy.clone(),
        }
    }
}
