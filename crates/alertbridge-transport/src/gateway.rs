//! Readiness-gated dispatch and health reporting.

use std::sync::Arc;

use alertbridge_core::{
    SessionIdentity, StateCell,
    traits::{ProviderError, SessionProvider},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request to send one message.
///
/// Missing fields deserialize as empty and are rejected by validation, so a
/// body without them is a client error rather than a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRequest {
    /// Provider-defined conversation address, e.g. a group handle.
    #[serde(default, alias = "groupId")]
    pub target: String,
    /// Plain text payload.
    #[serde(default)]
    pub message: String,
}

impl DispatchRequest {
    #[must_use]
    pub fn new(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Check both fields are present. A whitespace-only target is treated as
    /// missing; the message is sent as given as long as it is not empty.
    ///
    /// # Errors
    /// Returns `InvalidRequest` naming the first missing field.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.target.trim().is_empty() {
            return Err(DispatchError::InvalidRequest("target is required".to_string()));
        }
        if self.message.is_empty() {
            return Err(DispatchError::InvalidRequest("message is required".to_string()));
        }
        Ok(())
    }
}

/// Dispatch failure kinds visible to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Malformed input; the provider was not called.
    #[error("{0}")]
    InvalidRequest(String),
    /// Session is not ready; retry later.
    #[error("session not ready")]
    SessionNotReady,
    /// Provider rejected or failed the send; its text is kept verbatim.
    #[error(transparent)]
    ProviderDispatchFailure(#[from] ProviderError),
}

/// Outcome of a single dispatch attempt. There is no retry metadata.
pub type DispatchResult = Result<(), DispatchError>;

/// Readiness and identity at the time of the read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthReport {
    pub ready: bool,
    pub identity: Option<Arc<SessionIdentity>>,
}

/// Forwards send requests to the provider while the session is ready.
///
/// Only reads the shared state; transitions belong to the lifecycle manager.
#[derive(Clone)]
pub struct DispatchGateway {
    state: Arc<StateCell>,
    provider: Arc<dyn SessionProvider>,
}

impl DispatchGateway {
    #[must_use]
    pub fn new(state: Arc<StateCell>, provider: Arc<dyn SessionProvider>) -> Self {
        Self { state, provider }
    }

    /// Send one message, exactly once, if the session is ready right now.
    ///
    /// The session may drop while the provider call is in flight; the result
    /// is then whatever the provider reports.
    ///
    /// # Errors
    /// `InvalidRequest` and `SessionNotReady` without touching the provider,
    /// or `ProviderDispatchFailure` with the provider's message.
    pub async fn dispatch(&self, request: &DispatchRequest) -> DispatchResult {
        request.validate()?;

        let state = self.state.state();
        if !state.can_dispatch() {
            tracing::debug!(%state, "Rejecting dispatch, session not ready");
            return Err(DispatchError::SessionNotReady);
        }

        tracing::info!(conversation = %request.target, "Dispatching message");
        self.provider
            .send_message(&request.target, &request.message)
            .await
            .map_err(|e| {
                tracing::error!(conversation = %request.target, "Dispatch failed: {e}");
                DispatchError::from(e)
            })
    }

    /// Current readiness and identity. Never fails.
    #[must_use]
    pub fn health(&self) -> HealthReport {
        let snapshot = self.state.snapshot();
        HealthReport {
            ready: snapshot.state.can_dispatch(),
            identity: snapshot.identity,
        }
    }
}

#[cfg(test)]
mod tests {
    use alertbridge_core::{LogPairingPresenter, SessionConfig, SessionState};
    use alertbridge_session::{LifecycleManager, provider::MemoryProvider};
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    fn ops() -> SessionIdentity {
        SessionIdentity::new("Ops", "5511999999999")
    }

    async fn setup() -> (Arc<MemoryProvider>, Arc<LifecycleManager>, DispatchGateway) {
        let provider = Arc::new(MemoryProvider::new());
        let manager = LifecycleManager::new(
            SessionConfig::new("test-client", "./session"),
            provider.clone(),
            Arc::new(LogPairingPresenter),
        );
        manager.initialize().await;
        let gateway = DispatchGateway::new(manager.state_handle(), manager.provider());
        (provider, manager, gateway)
    }

    fn make_ready(provider: &MemoryProvider) {
        provider.emit_authenticated();
        provider.emit_ready(ops());
    }

    #[tokio::test]
    async fn test_blank_fields_are_invalid_without_provider_call() {
        let (provider, _manager, gateway) = setup().await;
        make_ready(&provider);

        for request in [
            DispatchRequest::default(),
            DispatchRequest::new("", "hi"),
            DispatchRequest::new("g1", ""),
            DispatchRequest::new("  ", "hi"),
        ] {
            let err = assert_err!(gateway.dispatch(&request).await);
            assert!(matches!(err, DispatchError::InvalidRequest(_)), "{request:?}");
        }
        assert_eq!(provider.send_attempts(), 0);
    }

    #[tokio::test]
    async fn test_whitespace_message_is_sent_as_given() {
        let (provider, _manager, gateway) = setup().await;
        make_ready(&provider);

        assert_ok!(gateway.dispatch(&DispatchRequest::new("g1", "\n")).await);
        assert_ok!(gateway.dispatch(&DispatchRequest::new("g1", "  ")).await);

        assert_eq!(provider.delivered(), 2);
        assert_eq!(provider.last_sent().unwrap().message, "  ");
    }

    #[tokio::test]
    async fn test_not_ready_states_reject_without_provider_call() {
        let (provider, manager, gateway) = setup().await;
        let request = DispatchRequest::new("g1", "hi");

        assert_eq!(manager.current_state(), SessionState::AwaitingPairing);
        assert_eq!(gateway.dispatch(&request).await, Err(DispatchError::SessionNotReady));

        provider.emit_authenticated();
        assert_eq!(gateway.dispatch(&request).await, Err(DispatchError::SessionNotReady));

        provider.emit_auth_failure("bad credentials");
        assert_eq!(manager.current_state(), SessionState::Uninitialized);
        assert_eq!(gateway.dispatch(&request).await, Err(DispatchError::SessionNotReady));

        assert_eq!(provider.send_attempts(), 0);
    }

    #[tokio::test]
    async fn test_disconnected_rejects_without_provider_call() {
        let (provider, manager, gateway) = setup().await;
        make_ready(&provider);
        assert_eq!(manager.current_state(), SessionState::Ready);

        provider.emit_disconnected("network lost");
        assert_eq!(manager.current_state(), SessionState::Disconnected);
        assert_eq!(
            gateway.dispatch(&DispatchRequest::new("g1", "hi")).await,
            Err(DispatchError::SessionNotReady)
        );
        assert_eq!(provider.send_attempts(), 0);
    }

    #[tokio::test]
    async fn test_ready_dispatch_forwards_once() {
        let (provider, _manager, gateway) = setup().await;
        make_ready(&provider);

        assert_ok!(gateway.dispatch(&DispatchRequest::new("g1", "hi")).await);

        assert_eq!(provider.send_attempts(), 1);
        assert_eq!(provider.last_sent().unwrap().target, "g1");
    }

    #[tokio::test]
    async fn test_provider_error_text_passed_through() {
        let (provider, _manager, gateway) = setup().await;
        make_ready(&provider);
        provider.fail_sends_with("number not registered");

        let err = assert_err!(gateway.dispatch(&DispatchRequest::new("g1", "hi")).await);
        assert_eq!(err.to_string(), "number not registered");
        assert_eq!(provider.send_attempts(), 1);
    }

    #[tokio::test]
    async fn test_health_tracks_readiness_and_identity() {
        let (provider, _manager, gateway) = setup().await;
        assert_eq!(gateway.health(), HealthReport::default());

        make_ready(&provider);
        let report = gateway.health();
        assert!(report.ready);
        assert_eq!(report.identity.as_deref(), Some(&ops()));

        provider.emit_disconnected("network lost");
        assert_eq!(gateway.health(), HealthReport::default());
    }

    #[test]
    fn test_group_id_alias_accepted() {
        let request: DispatchRequest =
            serde_json::from_str(r#"{"groupId":"g1","message":"hi"}"#).unwrap();
        assert_eq!(request, DispatchRequest::new("g1", "hi"));
    }
}
