//! Route configuration for the gateway

use actix_web::web;

use crate::handlers;

/// Configure all routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health_check))
        // Auth routes: forwarded, never retried
        .route("/register", web::post().to(handlers::register))
        .route("/login", web::post().to(handlers::login))
        // Payment routes: mutating routes enqueue retries on failure
        .service(
            web::scope("/payments")
                .route("/initiate", web::post().to(handlers::initiate_payment))
                .route(
                    "/send-to-mobile",
                    web::post().to(handlers::send_to_mobile),
                )
                .route("/status/{id}", web::get().to(handlers::payment_status)),
        );
}
