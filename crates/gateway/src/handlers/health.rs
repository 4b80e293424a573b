//! Health check endpoint

use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;

use crate::queue::RetryQueue;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub broker: String,
    pub version: String,
}

/// Health check endpoint
///
/// Reports gateway liveness and broker reachability.
pub async fn health_check(queue: web::Data<dyn RetryQueue>) -> impl Responder {
    let broker_status = match queue.len().await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    let response = HealthResponse {
        status: if broker_status == "connected" {
            "healthy"
        } else {
            "unhealthy"
        }
        .to_string(),
        broker: broker_status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    if broker_status == "connected" {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
