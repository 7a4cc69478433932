use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::dispatch::Dispatcher;
use crate::messages::{Request, Response};

/// Text the host runtime reports once the privileged side has been reloaded.
pub const CONTEXT_INVALIDATED_TEXT: &str = "Extension context invalidated";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("{0}")]
    Disconnected(String),
    #[error("message could not be encoded: {0}")]
    Codec(#[from] serde_json::Error),
}

impl TransportError {
    pub fn is_context_invalidated(&self) -> bool {
        match self {
            TransportError::Disconnected(message) => message.contains(CONTEXT_INVALIDATED_TEXT),
            TransportError::Codec(_) => false,
        }
    }
}

/// One request, one response, across the context boundary.
#[async_trait::async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, TransportError>;
}

/// Serializes every message to JSON and back, so both sides only share the
/// wire format.
pub struct InProcessTransport {
    dispatcher: Arc<Dispatcher>,
    invalidated: AtomicBool,
}

impl InProcessTransport {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            invalidated: AtomicBool::new(false),
        }
    }

    /// Simulates a reload of the privileged side; every later send fails.
    pub fn invalidate(&self) {
        self.invalidated.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl MessageTransport for InProcessTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        if self.invalidated.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected(format!("{CONTEXT_INVALIDATED_TEXT}.")));
        }
        let wire = serde_json::to_string(&request)?;
        let received: Request = serde_json::from_str(&wire)?;
        let response = self.dispatcher.handle(received).await;
        let wire = serde_json::to_string(&response)?;
        Ok(serde_json::from_str(&wire)?)
    }
}
