//! Downstream HTTP callers for the auth and payment backends
//!
//! The gateway forwards request bodies unmodified and relays the
//! downstream status and body byte-for-byte. A trait seam keeps the
//! dispatcher and the retry workers testable against fakes.

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use shared::config::DownstreamConfig;

/// Downstream call errors
#[derive(Debug, Error)]
pub enum DownstreamError {
    /// Transport-level failure (connection refused, timeout, DNS)
    #[error("Transport error: {0}")]
    Transport(String),
}

impl DownstreamError {
    /// Create a transport error
    pub fn transport(details: impl Into<String>) -> Self {
        DownstreamError::Transport(details.into())
    }
}

impl From<reqwest::Error> for DownstreamError {
    fn from(e: reqwest::Error) -> Self {
        DownstreamError::Transport(e.to_string())
    }
}

/// Verbatim downstream response, relayed to the client unchanged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    /// Downstream HTTP status code
    pub status: u16,
    /// Downstream response body
    pub body: Vec<u8>,
}

impl ProxyResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the downstream call succeeded (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Convenience result type for downstream calls
pub type DownstreamResult = Result<ProxyResponse, DownstreamError>;

/// Outbound calls to the auth and payment backends
#[async_trait]
pub trait DownstreamClient: Send + Sync {
    /// POST {auth}/auth/register
    async fn register(&self, body: &[u8]) -> DownstreamResult;

    /// POST {auth}/auth/login
    async fn login(&self, body: &[u8]) -> DownstreamResult;

    /// POST {payments}/payments/initiate
    async fn initiate_payment(&self, body: &[u8]) -> DownstreamResult;

    /// POST {payments}/payments/send-to-mobile
    async fn send_to_mobile(&self, body: &[u8]) -> DownstreamResult;

    /// GET {payments}/payments/status/{id}
    async fn payment_status(&self, id: &str) -> DownstreamResult;
}

/// reqwest-backed downstream client
///
/// One client instance is shared by the dispatcher and all retry workers;
/// every request carries the configured timeout.
pub struct HttpDownstream {
    client: Client,
    auth_base_url: String,
    payments_base_url: String,
}

impl HttpDownstream {
    /// Build a client from the downstream configuration
    pub fn new(config: &DownstreamConfig) -> Result<Self, DownstreamError> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            auth_base_url: config.auth_base_url.clone(),
            payments_base_url: config.payments_base_url.clone(),
        })
    }

    async fn post(&self, url: String, body: &[u8]) -> DownstreamResult {
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_vec())
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(ProxyResponse { status, body })
    }

    async fn get(&self, url: String) -> DownstreamResult {
        let response = self.client.get(&url).send().await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(ProxyResponse { status, body })
    }
}

#[async_trait]
impl DownstreamClient for HttpDownstream {
    async fn register(&self, body: &[u8]) -> DownstreamResult {
        self.post(format!("{}/auth/register", self.auth_base_url), body)
            .await
    }

    async fn login(&self, body: &[u8]) -> DownstreamResult {
        self.post(format!("{}/auth/login", self.auth_base_url), body)
            .await
    }

    async fn initiate_payment(&self, body: &[u8]) -> DownstreamResult {
        self.post(
            format!("{}/payments/initiate", self.payments_base_url),
            body,
        )
        .await
    }

    async fn send_to_mobile(&self, body: &[u8]) -> DownstreamResult {
        self.post(
            format!("{}/payments/send-to-mobile", self.payments_base_url),
            body,
        )
        .await
    }

    async fn payment_status(&self, id: &str) -> DownstreamResult {
        self.get(format!("{}/payments/status/{}", self.payments_base_url, id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::config::DownstreamConfig;

    fn test_config() -> DownstreamConfig {
        DownstreamConfig {
            auth_base_url: "http://localhost:8081".to_string(),
            payments_base_url: "http://localhost:8082".to_string(),
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_http_downstream_builds_from_config() {
        let downstream = HttpDownstream::new(&test_config()).unwrap();
        assert_eq!(downstream.auth_base_url, "http://localhost:8081");
        assert_eq!(downstream.payments_base_url, "http://localhost:8082");
    }

    #[test]
    fn test_proxy_response_success_range() {
        assert!(ProxyResponse::new(200, "").is_success());
        assert!(ProxyResponse::new(202, "").is_success());
        assert!(ProxyResponse::new(299, "").is_success());
        assert!(!ProxyResponse::new(199, "").is_success());
        assert!(!ProxyResponse::new(301, "").is_success());
        assert!(!ProxyResponse::new(400, "").is_success());
        assert!(!ProxyResponse::new(500, "").is_success());
    }

    #[test]
    fn test_transport_error_display() {
        let err = DownstreamError::transport("connection refused");
        assert_eq!(err.to_string(), "Transport error: connection refused");
    }
}
