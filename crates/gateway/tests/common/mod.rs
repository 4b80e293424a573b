//! Shared test fixtures for gateway integration tests

use std::collections::VecDeque;
use std::sync::atomic::AtomicU32;
use std::sync::Mutex;

use async_trait::async_trait;

use gateway::downstream::{DownstreamClient, DownstreamError, DownstreamResult, ProxyResponse};

/// One scripted downstream outcome
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Respond with a status and body
    Response(u16, Vec<u8>),
    /// Fail at the transport level
    Transport,
}

impl Scripted {
    fn into_result(self) -> DownstreamResult {
        match self {
            Scripted::Response(status, body) => Ok(ProxyResponse::new(status, body)),
            Scripted::Transport => Err(DownstreamError::transport("connection refused")),
        }
    }
}

/// Fake downstream backend
///
/// Consumes scripted outcomes in order across all endpoints, then keeps
/// returning the fallback. Records per-endpoint call counts and the last
/// forwarded body.
pub struct FakeDownstream {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Scripted,
    pub register_calls: AtomicU32,
    pub login_calls: AtomicU32,
    pub initiate_calls: AtomicU32,
    pub mobile_calls: AtomicU32,
    pub status_calls: AtomicU32,
    pub last_body: Mutex<Option<Vec<u8>>>,
}

impl FakeDownstream {
    /// Every call produces `fallback`
    pub fn always(fallback: Scripted) -> Self {
        Self::with_script(Vec::new(), fallback)
    }

    /// Calls consume `script` in order, then fall back to `fallback`
    pub fn with_script(script: Vec<Scripted>, fallback: Scripted) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            register_calls: AtomicU32::new(0),
            login_calls: AtomicU32::new(0),
            initiate_calls: AtomicU32::new(0),
            mobile_calls: AtomicU32::new(0),
            status_calls: AtomicU32::new(0),
            last_body: Mutex::new(None),
        }
    }

    fn next(&self, body: Option<&[u8]>) -> DownstreamResult {
        if let Some(body) = body {
            *self.last_body.lock().unwrap() = Some(body.to_vec());
        }
        let scripted = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        scripted.into_result()
    }
}

#[async_trait]
impl DownstreamClient for FakeDownstream {
    async fn register(&self, body: &[u8]) -> DownstreamResult {
        self.register_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.next(Some(body))
    }

    async fn login(&self, body: &[u8]) -> DownstreamResult {
        self.login_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.next(Some(body))
    }

    async fn initiate_payment(&self, body: &[u8]) -> DownstreamResult {
        self.initiate_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.next(Some(body))
    }

    async fn send_to_mobile(&self, body: &[u8]) -> DownstreamResult {
        self.mobile_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.next(Some(body))
    }

    async fn payment_status(&self, _id: &str) -> DownstreamResult {
        self.status_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.next(None)
    }
}
