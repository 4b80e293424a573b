//! Retry consumer: drains the retry queue and launches workers
//!
//! One long-lived background task owns the subscription. Each delivered
//! message is handed to an independent worker task; fan-out is bounded by
//! a semaphore so a sustained backend outage cannot grow the task count
//! without limit. Broker errors inside the loop back off and retry; only
//! the initial connection at startup is allowed to kill the process.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use shared::config::RetryConfig;
use shared::RetryMessage;

use crate::dlq::DeadLetterQueue;
use crate::downstream::DownstreamClient;
use crate::queue::RetryQueue;
use crate::worker::RetryWorker;

/// Background consumer of the retry queue
pub struct RetryPoller<C, Q, D>
where
    C: DownstreamClient,
    Q: RetryQueue,
    D: DeadLetterQueue,
{
    queue: Arc<Q>,
    worker: RetryWorker<C, Q, D>,
    semaphore: Arc<Semaphore>,
    consume_timeout_secs: u64,
    consume_backoff: Duration,
}

impl<C, Q, D> RetryPoller<C, Q, D>
where
    C: DownstreamClient + 'static,
    Q: RetryQueue + 'static,
    D: DeadLetterQueue + 'static,
{
    /// Create a new poller
    pub fn new(queue: Arc<Q>, worker: RetryWorker<C, Q, D>, config: &RetryConfig) -> Self {
        Self {
            queue,
            worker,
            semaphore: Arc::new(Semaphore::new(config.worker_concurrency)),
            consume_timeout_secs: config.consume_timeout_secs,
            consume_backoff: config.consume_backoff(),
        }
    }

    /// Spawn the consume loop as a background task
    ///
    /// Returns a cancellation token that stops the loop. In-flight
    /// workers are not cancelled; they run to their terminal outcome.
    pub fn start(self) -> CancellationToken {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        tokio::spawn(async move {
            self.run(token).await;
        });

        cancel_token
    }

    /// Consume loop. Exits only on cancellation.
    pub async fn run(self, cancel_token: CancellationToken) {
        tracing::info!(
            worker_concurrency = self.semaphore.available_permits(),
            "Retry poller started"
        );

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    tracing::info!("Retry poller stopping due to shutdown");
                    break;
                }
                result = self.queue.consume(self.consume_timeout_secs) => {
                    match result {
                        Ok(Some(message)) => self.dispatch(message).await,
                        Ok(None) => {
                            // Timeout, or an undecodable element was dropped
                        }
                        Err(e) => {
                            tracing::error!(
                                error = %e,
                                backoff_secs = self.consume_backoff.as_secs(),
                                "Queue consume failed, backing off"
                            );
                            tokio::time::sleep(self.consume_backoff).await;
                        }
                    }
                }
            }
        }
    }

    /// Launch one worker task for a delivered message
    ///
    /// Waits for a concurrency permit first, which pauses consumption
    /// when every worker slot is busy.
    async fn dispatch(&self, message: RetryMessage) {
        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            // The semaphore is never closed while the poller runs
            Err(_) => return,
        };

        tracing::info!(
            message_id = %message.id,
            payment_type = %message.payment_type,
            cycle = message.cycle,
            "Dispatching retry worker"
        );

        let worker = self.worker.clone();
        tokio::spawn(async move {
            worker.run(message).await;
            drop(permit);
        });
    }
}
