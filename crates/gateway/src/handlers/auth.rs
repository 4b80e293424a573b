//! Auth route handlers
//!
//! Forwarded verbatim to the authentication backend. Failures here are
//! terminal: auth routes never enqueue retries.

use actix_web::{web, HttpResponse};

use crate::downstream::DownstreamClient;
use crate::handlers::helpers::{relay, transport_error};

/// POST /register
pub async fn register(
    downstream: web::Data<dyn DownstreamClient>,
    body: web::Bytes,
) -> HttpResponse {
    match downstream.register(&body).await {
        Ok(response) => relay(response),
        Err(e) => {
            tracing::error!(error = %e, "Failed to reach auth backend for register");
            transport_error()
        }
    }
}

/// POST /login
pub async fn login(downstream: web::Data<dyn DownstreamClient>, body: web::Bytes) -> HttpResponse {
    match downstream.login(&body).await {
        Ok(response) => relay(response),
        Err(e) => {
            tracing::error!(error = %e, "Failed to reach auth backend for login");
            transport_error()
        }
    }
}
