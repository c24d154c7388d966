//! Lifecycle manager for the messaging session.

use std::sync::{
    Arc, Mutex, PoisonError, Weak,
    atomic::{AtomicUsize, Ordering},
};

use alertbridge_core::{
    SessionConfig, SessionIdentity, SessionState, StateCell,
    traits::{PairingPresenter, SessionEvents, SessionProvider},
};
use tokio::task::JoinHandle;

use SessionState::{AwaitingPairing, Authenticated, Disconnected, Ready, Uninitialized};

/// States a transport disconnect is accepted from.
const CONNECTED_OR_CONNECTING: [SessionState; 4] =
    [AwaitingPairing, Authenticated, Ready, Disconnected];

/// Lifecycle manager for the single messaging session.
///
/// Owns the readiness state machine and registers itself with the provider as
/// the event sink. After a disconnect it re-initializes the provider once the
/// fixed reconnect delay elapses, forever. Authentication failures park the
/// session in `Uninitialized` until [`LifecycleManager::initialize`] is called
/// again.
///
/// Event handlers arm timers with `tokio::spawn`, so events must be delivered
/// from within a Tokio runtime.
pub struct LifecycleManager {
    config: SessionConfig,
    state: Arc<StateCell>,
    provider: Arc<dyn SessionProvider>,
    presenter: Arc<dyn PairingPresenter>,
    reconnect_slot: Mutex<Option<JoinHandle<()>>>,
    reconnect_attempts: AtomicUsize,
    this: Weak<Self>,
}

impl LifecycleManager {
    /// Create a new lifecycle manager in `Uninitialized`.
    #[must_use]
    pub fn new(
        config: SessionConfig,
        provider: Arc<dyn SessionProvider>,
        presenter: Arc<dyn PairingPresenter>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            config,
            state: Arc::new(StateCell::new()),
            provider,
            presenter,
            reconnect_slot: Mutex::new(None),
            reconnect_attempts: AtomicUsize::new(0),
            this: this.clone(),
        })
    }

    /// Shared state handle for readers such as the dispatch gateway.
    #[must_use]
    pub fn state_handle(&self) -> Arc<StateCell> {
        Arc::clone(&self.state)
    }

    /// Provider this manager drives.
    #[must_use]
    pub fn provider(&self) -> Arc<dyn SessionProvider> {
        Arc::clone(&self.provider)
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current readiness state.
    #[must_use]
    pub fn current_state(&self) -> SessionState {
        self.state.state()
    }

    /// Logged-in identity; `None` unless ready.
    #[must_use]
    pub fn current_identity(&self) -> Option<Arc<SessionIdentity>> {
        self.state.identity()
    }

    /// Number of times the reconnect timer has fired.
    #[must_use]
    pub fn reconnect_attempts(&self) -> usize {
        self.reconnect_attempts.load(Ordering::SeqCst)
    }

    /// Whether a reconnect timer is armed.
    #[must_use]
    pub fn reconnect_pending(&self) -> bool {
        self.lock_slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Start the provider session.
    ///
    /// Only acts from `Uninitialized`; anywhere else it is a no-op so a second
    /// call cannot open a duplicate provider session. Returns whether this call
    /// started the session.
    pub async fn initialize(&self) -> bool {
        match self.state.transition(&[Uninitialized], AwaitingPairing) {
            Ok(previous) => {
                log_transition(previous, AwaitingPairing);
                self.start_provider().await;
                true
            }
            Err(current) => {
                tracing::debug!(state = %current, "Session already initialized, ignoring");
                false
            }
        }
    }

    async fn start_provider(&self) {
        let Some(events) = self.events_handle() else {
            return;
        };
        tracing::info!(client_id = %self.config.client_id, "Initializing session provider");

        if let Err(e) = self.provider.initialize(&self.config, events).await {
            tracing::error!("Session provider failed to initialize: {e}");
            self.handle_disconnect(&format!("initialize failed: {e}"));
        }
    }

    fn events_handle(&self) -> Option<Arc<dyn SessionEvents>> {
        self.this
            .upgrade()
            .map(|manager| manager as Arc<dyn SessionEvents>)
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.reconnect_slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn handle_disconnect(&self, reason: &str) {
        match self.state.transition(&CONNECTED_OR_CONNECTING, Disconnected) {
            Ok(previous) => {
                tracing::warn!(reason, "Session disconnected");
                if previous != Disconnected {
                    log_transition(previous, Disconnected);
                }
                self.schedule_reconnect();
            }
            Err(current) => {
                tracing::debug!(state = %current, reason, "Ignoring disconnect");
            }
        }
    }

    /// Arm the reconnect timer unless one is already pending.
    fn schedule_reconnect(&self) {
        let mut slot = self.lock_slot();
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            tracing::debug!("Reconnect already scheduled");
            return;
        }
        let Some(manager) = self.this.upgrade() else {
            return;
        };

        let delay = self.config.reconnect_delay;
        tracing::warn!(delay_secs = delay.as_secs_f64(), "Reconnecting after delay");

        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            manager.lock_slot().take();
            manager.reconnect().await;
        }));
    }

    fn cancel_reconnect(&self) {
        if let Some(handle) = self.lock_slot().take() {
            handle.abort();
            tracing::debug!("Pending reconnect cancelled");
        }
    }

    async fn reconnect(&self) {
        let attempt = self.reconnect_attempts.fetch_add(1, Ordering::SeqCst) + 1;

        match self.state.transition(&[Disconnected], AwaitingPairing) {
            Ok(previous) => {
                tracing::info!(attempt, "Reconnecting session");
                log_transition(previous, AwaitingPairing);
                self.start_provider().await;
            }
            Err(current) => {
                tracing::debug!(state = %current, "Session left Disconnected, skipping reconnect");
            }
        }
    }
}

fn log_transition(from: SessionState, to: SessionState) {
    tracing::info!(%from, %to, "Session state changed");
}

impl SessionEvents for LifecycleManager {
    fn on_pairing_code(&self, code: String) {
        let state = self.state.state();
        if state == AwaitingPairing {
            self.presenter.present(&self.config.client_id, &code);
        } else {
            tracing::debug!(%state, "Ignoring pairing code outside pairing");
        }
    }

    fn on_authenticated(&self) {
        match self.state.transition(&[AwaitingPairing], Authenticated) {
            Ok(previous) => {
                tracing::info!("Session authenticated");
                log_transition(previous, Authenticated);
            }
            Err(current) => {
                tracing::warn!(state = %current, "Unexpected authenticated event, ignoring");
            }
        }
    }

    fn on_ready(&self, identity: SessionIdentity) {
        let (name, id) = (identity.name.clone(), identity.id.clone());
        // Providers restoring stored credentials report ready without a separate
        // authenticated event.
        if self.state.transition(&[AwaitingPairing], Authenticated).is_ok() {
            tracing::info!("Session authenticated from stored credentials");
            log_transition(AwaitingPairing, Authenticated);
        }
        match self.state.enter_ready(&[Authenticated], identity) {
            Ok(previous) => {
                tracing::info!(%name, %id, "Session ready for dispatch");
                log_transition(previous, Ready);
            }
            Err(current) => {
                tracing::warn!(state = %current, "Unexpected ready event, ignoring");
            }
        }
    }

    fn on_auth_failure(&self, reason: String) {
        self.cancel_reconnect();
        match self.state.transition(&SessionState::ALL, Uninitialized) {
            Ok(Uninitialized) | Err(_) => {}
            Ok(previous) => log_transition(previous, Uninitialized),
        }
        tracing::error!(
            %reason,
            "Session authentication failed; pairing again requires operator action"
        );
    }

    fn on_disconnected(&self, reason: String) {
        self.handle_disconnect(&reason);
    }
}
