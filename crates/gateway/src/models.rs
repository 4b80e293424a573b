//! Common DTOs for gateway-originated responses
//!
//! Downstream responses are relayed byte-for-byte; these types only shape
//! the bodies the gateway produces itself (validation failures, transport
//! errors, health).

use serde::{Deserialize, Serialize};

/// Standard error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
