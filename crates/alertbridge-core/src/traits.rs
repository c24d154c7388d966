//! Core traits for the session provider and its lifecycle events.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::{SessionConfig, SessionIdentity};

/// Error reported by the session provider.
///
/// The message is the provider's own text and is surfaced to callers verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Receiver of provider lifecycle events.
///
/// Providers deliver events serially, in the order they happen.
pub trait SessionEvents: Send + Sync {
    /// A pairing code must be shown to the operator. May repeat while pairing.
    fn on_pairing_code(&self, code: String);

    /// Credentials were accepted.
    fn on_authenticated(&self);

    /// Session is usable, logged in as `identity`.
    fn on_ready(&self, identity: SessionIdentity);

    /// Pairing or stored credentials were rejected.
    fn on_auth_failure(&self, reason: String);

    /// Transport to the messaging network was lost.
    fn on_disconnected(&self, reason: String);
}

/// Capability interface of the external session provider.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Start (or restart) the provider session, delivering lifecycle events to `events`.
    ///
    /// Returning is not readiness; readiness is signalled through `events`.
    async fn initialize(
        &self,
        config: &SessionConfig,
        events: Arc<dyn SessionEvents>,
    ) -> Result<(), ProviderError>;

    /// Send a plain text message to `target`.
    async fn send_message(&self, target: &str, message: &str) -> Result<(), ProviderError>;

    /// Identity the provider currently reports, if any.
    fn current_identity(&self) -> Option<SessionIdentity>;
}

/// Presents pairing codes to the operator.
///
/// Implement this to render codes however the deployment needs (terminal QR, web page, chat).
pub trait PairingPresenter: Send + Sync {
    /// Show `code` for the session identified by `client_id`.
    fn present(&self, client_id: &str, code: &str);
}

/// Presenter that writes the pairing code to the log.
#[derive(Debug, Default, Clone)]
pub struct LogPairingPresenter;

impl PairingPresenter for LogPairingPresenter {
    fn present(&self, client_id: &str, code: &str) {
        tracing::info!(client_id, code, "Pairing code received; link the device to continue");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_displays_message_verbatim() {
        let err = ProviderError::new("number not registered");
        assert_eq!(err.to_string(), "number not registered");
    }
}
