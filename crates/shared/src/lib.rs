//! Shared library for the payment gateway
//!
//! This crate provides common functionality used across the gateway:
//! - Configuration management
//! - Error handling types
//! - The retry message model and payment-type classification
//! - Logging infrastructure

pub mod config;
pub mod error;
pub mod message;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use message::{
    classify_payload, PaymentType, RetryMessage, PAYMENT_RETRY_DLQ, PAYMENT_RETRY_QUEUE,
};

/// Initialize tracing subscriber for structured logging
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shared=debug,gateway=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
