//! Payment Gateway Library
//!
//! Exposes the gateway's components for integration tests: the
//! reverse-proxy handlers, the downstream HTTP callers, the retry queue
//! client and the retry engine (poller + workers).

pub mod dlq;
pub mod downstream;
pub mod handlers;
pub mod models;
pub mod poller;
pub mod queue;
pub mod routes;
pub mod worker;
