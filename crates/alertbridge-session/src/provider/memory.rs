//! In-memory session provider.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alertbridge_core::{
    SessionConfig, SessionIdentity,
    traits::{ProviderError, SessionEvents, SessionProvider},
};
use async_trait::async_trait;

/// The most recent message accepted by the in-memory provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub target: String,
    pub message: String,
}

#[derive(Default)]
struct Inner {
    events: Option<Arc<dyn SessionEvents>>,
    initialize_calls: usize,
    send_attempts: usize,
    delivered: usize,
    last_sent: Option<SentMessage>,
    identity: Option<SessionIdentity>,
    auto_ready: Option<SessionIdentity>,
    send_failure: Option<String>,
    initialize_failure: Option<String>,
}

/// In-memory provider implementation.
///
/// Useful for development and tests: nothing leaves the process, and only a
/// count plus the latest message are kept. With
/// [`MemoryProvider::with_auto_ready`] every initialize authenticates and
/// becomes ready immediately; otherwise lifecycle events are driven by hand
/// through the `emit_*` methods.
#[derive(Default)]
pub struct MemoryProvider {
    inner: Mutex<Inner>,
}

impl MemoryProvider {
    /// Create a provider that waits for events to be emitted by hand.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Authenticate and report `identity` as ready on every initialize.
    #[must_use]
    pub fn with_auto_ready(identity: SessionIdentity) -> Self {
        let provider = Self::new();
        provider.lock().auto_ready = Some(identity);
        provider
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn events(&self) -> Option<Arc<dyn SessionEvents>> {
        self.lock().events.clone()
    }

    /// Make every following send fail with `message`.
    pub fn fail_sends_with(&self, message: impl Into<String>) {
        self.lock().send_failure = Some(message.into());
    }

    /// Make every following initialize fail with `message`.
    pub fn fail_initialize_with(&self, message: impl Into<String>) {
        self.lock().initialize_failure = Some(message.into());
    }

    /// Let sends and initializes succeed again.
    pub fn clear_failures(&self) {
        let mut inner = self.lock();
        inner.send_failure = None;
        inner.initialize_failure = None;
    }

    /// Number of initialize calls received.
    #[must_use]
    pub fn initialize_calls(&self) -> usize {
        self.lock().initialize_calls
    }

    /// Number of send calls received, failed ones included.
    #[must_use]
    pub fn send_attempts(&self) -> usize {
        self.lock().send_attempts
    }

    /// Number of sends accepted.
    #[must_use]
    pub fn delivered(&self) -> usize {
        self.lock().delivered
    }

    /// Latest accepted message.
    #[must_use]
    pub fn last_sent(&self) -> Option<SentMessage> {
        self.lock().last_sent.clone()
    }

    /// Emit a pairing code to the registered sink.
    pub fn emit_pairing_code(&self, code: impl Into<String>) {
        if let Some(events) = self.events() {
            events.on_pairing_code(code.into());
        }
    }

    /// Emit `authenticated` to the registered sink.
    pub fn emit_authenticated(&self) {
        if let Some(events) = self.events() {
            events.on_authenticated();
        }
    }

    /// Emit `ready` with `identity` to the registered sink.
    pub fn emit_ready(&self, identity: SessionIdentity) {
        self.lock().identity = Some(identity.clone());
        if let Some(events) = self.events() {
            events.on_ready(identity);
        }
    }

    /// Emit `auth_failure` to the registered sink.
    pub fn emit_auth_failure(&self, reason: impl Into<String>) {
        self.lock().identity = None;
        if let Some(events) = self.events() {
            events.on_auth_failure(reason.into());
        }
    }

    /// Emit `disconnected` to the registered sink.
    pub fn emit_disconnected(&self, reason: impl Into<String>) {
        self.lock().identity = None;
        if let Some(events) = self.events() {
            events.on_disconnected(reason.into());
        }
    }
}

#[async_trait]
impl SessionProvider for MemoryProvider {
    async fn initialize(
        &self,
        config: &SessionConfig,
        events: Arc<dyn SessionEvents>,
    ) -> Result<(), ProviderError> {
        let auto_ready = {
            let mut inner = self.lock();
            inner.initialize_calls += 1;
            inner.events = Some(Arc::clone(&events));
            if let Some(message) = &inner.initialize_failure {
                return Err(ProviderError::new(message.clone()));
            }
            inner.auto_ready.clone()
        };

        tracing::debug!(client_id = %config.client_id, "In-memory provider initialized");

        if let Some(identity) = auto_ready {
            events.on_authenticated();
            self.lock().identity = Some(identity.clone());
            events.on_ready(identity);
        }
        Ok(())
    }

    async fn send_message(&self, target: &str, message: &str) -> Result<(), ProviderError> {
        let mut inner = self.lock();
        inner.send_attempts += 1;
        if let Some(failure) = &inner.send_failure {
            return Err(ProviderError::new(failure.clone()));
        }
        inner.delivered += 1;
        inner.last_sent = Some(SentMessage {
            target: target.to_string(),
            message: message.to_string(),
        });
        drop(inner);
        tracing::warn!(
            conversation = %target,
            "In-memory provider accepted a message; it was not delivered anywhere"
        );
        Ok(())
    }

    fn current_identity(&self) -> Option<SessionIdentity> {
        self.lock().identity.clone()
    }
}
