//! Payment Gateway
//!
//! Unified HTTP surface in front of the auth and payment backends, with a
//! queue-backed retry engine that re-attempts failed payment calls
//! out-of-band. The HTTP server, the retry poller and the retry workers
//! all share this process.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tracing_actix_web::TracingLogger;

use shared::Config;

use gateway::dlq::RedisDlq;
use gateway::downstream::{DownstreamClient, HttpDownstream};
use gateway::poller::RetryPoller;
use gateway::queue::{RedisRetryQueue, RetryQueue};
use gateway::routes;
use gateway::worker::{RetryPolicy, RetryWorker};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    shared::init_tracing();

    tracing::info!("Starting Payment Gateway...");

    let config = Config::from_env().context("Failed to load configuration")?;

    // Broker connection; a failure here is fatal for the process
    let redis_client = redis::Client::open(config.broker.connection_url())
        .context("Failed to create broker client")?;
    let redis_conn = redis_client
        .get_multiplexed_async_connection()
        .await
        .context("Failed to connect to broker")?;

    tracing::info!(
        queue = %config.broker.queue_name,
        dlq = %config.broker.dlq_name,
        "Connected to broker"
    );

    let retry_queue = Arc::new(RedisRetryQueue::new(
        redis_conn.clone(),
        config.broker.queue_name.clone(),
    ));
    let dlq = Arc::new(RedisDlq::new(redis_conn, config.broker.dlq_name.clone()));
    let downstream = Arc::new(
        HttpDownstream::new(&config.downstream)
            .context("Failed to build downstream HTTP client")?,
    );

    // Retry engine: one poller task, bounded worker fan-out
    let worker = RetryWorker::new(
        downstream.clone(),
        retry_queue.clone(),
        dlq,
        RetryPolicy::from(&config.retry),
    );
    let poller = RetryPoller::new(retry_queue.clone(), worker, &config.retry);
    let poller_token = poller.start();

    let downstream_data: web::Data<dyn DownstreamClient> =
        web::Data::from(downstream as Arc<dyn DownstreamClient>);
    let queue_data: web::Data<dyn RetryQueue> =
        web::Data::from(retry_queue as Arc<dyn RetryQueue>);

    let server_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Payment Gateway listening on {}", server_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(downstream_data.clone())
            .app_data(queue_data.clone())
            .configure(routes::configure)
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind to {}", server_addr))?
    .run()
    .await
    .context("Server error")?;

    poller_token.cancel();
    tracing::info!("Shutdown complete");

    Ok(())
}
