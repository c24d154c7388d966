//! Session readiness state and the shared holder both components read.

use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};

/// Readiness of the messaging session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session has been started, or pairing failed and needs an operator.
    #[default]
    Uninitialized,
    /// Provider is starting up and waiting for the pairing step.
    AwaitingPairing,
    /// Credentials were accepted; the session is not usable yet.
    Authenticated,
    /// Session is usable for dispatch.
    Ready,
    /// Transport was lost; a reconnect is pending.
    Disconnected,
}

impl SessionState {
    /// Every state, for transitions allowed from anywhere.
    pub const ALL: [Self; 5] = [
        Self::Uninitialized,
        Self::AwaitingPairing,
        Self::Authenticated,
        Self::Ready,
        Self::Disconnected,
    ];

    /// Whether messages may be dispatched in this state.
    #[must_use]
    pub const fn can_dispatch(self) -> bool {
        matches!(self, Self::Ready)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::AwaitingPairing => "awaiting_pairing",
            Self::Authenticated => "authenticated",
            Self::Ready => "ready",
            Self::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account the session is logged in as, reported by the provider on ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    /// Display name of the account.
    pub name: String,
    /// Numeric account identifier (the phone number digits for phone-addressed networks).
    pub id: String,
}

impl SessionIdentity {
    #[must_use]
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// Consistent view of state plus identity.
///
/// The identity is present only while `state` is `Ready`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub identity: Option<Arc<SessionIdentity>>,
}

/// Shared session state holder.
///
/// State and identity are replaced together under one lock, so readers never
/// see a half-applied transition. Writes are compare-driven: a transition only
/// applies when the current state is one of the accepted sources.
#[derive(Debug, Default)]
pub struct StateCell {
    inner: RwLock<SessionSnapshot>,
}

impl StateCell {
    /// Create a holder in `Uninitialized`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state and identity.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    /// Current identity; `None` unless the session is ready.
    #[must_use]
    pub fn identity(&self) -> Option<Arc<SessionIdentity>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .identity
            .clone()
    }

    /// Move to `to` if the current state is in `from`, clearing the identity.
    ///
    /// Not for entering `Ready`; use [`StateCell::enter_ready`].
    ///
    /// # Errors
    /// Returns the current state if it is not an accepted source.
    pub fn transition(
        &self,
        from: &[SessionState],
        to: SessionState,
    ) -> Result<SessionState, SessionState> {
        debug_assert!(to != SessionState::Ready, "Ready is entered via enter_ready");
        self.replace(from, SessionSnapshot { state: to, identity: None })
    }

    /// Move to `Ready` with `identity` if the current state is in `from`.
    ///
    /// # Errors
    /// Returns the current state if it is not an accepted source.
    pub fn enter_ready(
        &self,
        from: &[SessionState],
        identity: SessionIdentity,
    ) -> Result<SessionState, SessionState> {
        self.replace(
            from,
            SessionSnapshot {
                state: SessionState::Ready,
                identity: Some(Arc::new(identity)),
            },
        )
    }

    fn replace(
        &self,
        from: &[SessionState],
        next: SessionSnapshot,
    ) -> Result<SessionState, SessionState> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let previous = guard.state;
        if !from.contains(&previous) {
            return Err(previous);
        }
        *guard = next;
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_uninitialized_without_identity() {
        let cell = StateCell::new();
        assert_eq!(cell.state(), SessionState::Uninitialized);
        assert!(cell.identity().is_none());
    }

    #[test]
    fn test_transition_rejected_from_wrong_state() {
        let cell = StateCell::new();
        let result = cell.transition(&[SessionState::AwaitingPairing], SessionState::Authenticated);
        assert_eq!(result, Err(SessionState::Uninitialized));
        assert_eq!(cell.state(), SessionState::Uninitialized);
    }

    #[test]
    fn test_identity_only_while_ready() {
        let cell = StateCell::new();
        cell.transition(&[SessionState::Uninitialized], SessionState::AwaitingPairing)
            .unwrap();
        cell.transition(&[SessionState::AwaitingPairing], SessionState::Authenticated)
            .unwrap();
        let previous = cell
            .enter_ready(&[SessionState::Authenticated], SessionIdentity::new("Ops", "5511999999999"))
            .unwrap();
        assert_eq!(previous, SessionState::Authenticated);

        let snapshot = cell.snapshot();
        assert_eq!(snapshot.state, SessionState::Ready);
        assert_eq!(snapshot.identity.as_deref().map(|i| i.name.as_str()), Some("Ops"));

        cell.transition(&SessionState::ALL, SessionState::Disconnected)
            .unwrap();
        assert!(cell.identity().is_none());
    }

    #[test]
    fn test_only_ready_can_dispatch() {
        for state in SessionState::ALL {
            assert_eq!(state.can_dispatch(), state == SessionState::Ready);
        }
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&SessionState::AwaitingPairing).unwrap();
        assert_eq!(json, "\"awaiting_pairing\"");
        assert_eq!(SessionState::Disconnected.to_string(), "disconnected");
    }
}
