//! Sidecar protocol handler.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
};

use alertbridge_core::{
    SessionConfig, SessionIdentity,
    traits::{ProviderError, SessionEvents},
};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    sync::oneshot,
    task::JoinHandle,
};
use uuid::Uuid;

use crate::protocol::{SidecarCommand, SidecarEvent};

/// Error text for sends cut short by the sidecar going away.
pub const CONNECTION_CLOSED: &str = "provider connection closed";

/// Protocol error.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

type SendOutcome = Result<(), ProviderError>;

#[derive(Default)]
struct PendingSends {
    closed: bool,
    waiting: HashMap<Uuid, oneshot::Sender<SendOutcome>>,
}

type SharedWriter = Arc<tokio::sync::Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// Handles bidirectional communication with one sidecar process.
///
/// Lifecycle events read from the sidecar are forwarded to the registered
/// sink; send results are matched to waiting callers by request id.
#[derive(Clone)]
pub struct ProtocolPeer {
    writer: SharedWriter,
    pending: Arc<Mutex<PendingSends>>,
    identity: Arc<RwLock<Option<SessionIdentity>>>,
}

impl ProtocolPeer {
    /// Spawn a new protocol peer.
    ///
    /// This starts a background task reading events from `reader`. When the
    /// reader reaches EOF, waiting sends fail and `on_disconnected` is emitted.
    #[must_use]
    pub fn spawn<R, W>(
        reader: R,
        writer: W,
        events: Arc<dyn SessionEvents>,
    ) -> (Self, JoinHandle<()>)
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let writer: Box<dyn AsyncWrite + Send + Unpin> = Box::new(writer);
        let peer = Self {
            writer: Arc::new(tokio::sync::Mutex::new(writer)),
            pending: Arc::new(Mutex::new(PendingSends::default())),
            identity: Arc::new(RwLock::new(None)),
        };

        let reader_peer = peer.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = reader_peer.read_loop(reader, events.as_ref()).await {
                tracing::error!("Sidecar reader loop error: {e}");
            }
            reader_peer.close();
            events.on_disconnected("sidecar exited".to_string());
        });

        (peer, handle)
    }

    async fn read_loop<R>(&self, reader: R, events: &dyn SessionEvents) -> Result<(), ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut buffer = String::new();

        loop {
            buffer.clear();
            if reader.read_line(&mut buffer).await? == 0 {
                tracing::debug!("Sidecar stdout closed");
                return Ok(());
            }
            let line = buffer.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<SidecarEvent>(line) {
                Ok(event) => self.handle_event(event, events),
                Err(e) => tracing::warn!(line, "Invalid sidecar message: {e}"),
            }
        }
    }

    fn handle_event(&self, event: SidecarEvent, events: &dyn SessionEvents) {
        match event {
            SidecarEvent::Qr { code } => events.on_pairing_code(code),
            SidecarEvent::Authenticated => events.on_authenticated(),
            SidecarEvent::Ready { name, id } => {
                let identity = SessionIdentity::new(name, id);
                self.set_identity(Some(identity.clone()));
                events.on_ready(identity);
            }
            SidecarEvent::AuthFailure { reason } => {
                self.set_identity(None);
                events.on_auth_failure(reason);
            }
            SidecarEvent::Disconnected { reason } => {
                self.set_identity(None);
                events.on_disconnected(reason);
            }
            SidecarEvent::SendResult {
                request_id,
                ok,
                error,
            } => {
                let outcome = if ok {
                    Ok(())
                } else {
                    Err(ProviderError::new(
                        error.unwrap_or_else(|| "send failed".to_string()),
                    ))
                };
                let waiting = self.lock_pending().waiting.remove(&request_id);
                match waiting {
                    Some(tx) => {
                        let _ = tx.send(outcome);
                    }
                    None => tracing::warn!(%request_id, "Send result for unknown request"),
                }
            }
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, PendingSends> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_identity(&self, identity: Option<SessionIdentity>) {
        *self.identity.write().unwrap_or_else(PoisonError::into_inner) = identity;
    }

    /// Identity from the last `ready` event, cleared on disconnect.
    #[must_use]
    pub fn current_identity(&self) -> Option<SessionIdentity> {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stop accepting sends and fail every waiting one.
    pub fn close(&self) {
        let waiting = {
            let mut pending = self.lock_pending();
            pending.closed = true;
            std::mem::take(&mut pending.waiting)
        };
        for (_, tx) in waiting {
            let _ = tx.send(Err(ProviderError::new(CONNECTION_CLOSED)));
        }
        self.set_identity(None);
    }

    /// Ask the sidecar to start the session.
    ///
    /// # Errors
    /// Returns error if write fails.
    pub async fn initialize(&self, config: &SessionConfig) -> Result<(), ProtocolError> {
        self.send_json(&SidecarCommand::Initialize {
            client_id: config.client_id.clone(),
            data_path: config.data_path.to_string_lossy().into_owned(),
        })
        .await
    }

    /// Send a message and wait for the sidecar's result.
    ///
    /// # Errors
    /// Returns the sidecar's error text, or [`CONNECTION_CLOSED`] if it went away.
    pub async fn send_message(&self, target: &str, message: &str) -> Result<(), ProviderError> {
        let request_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.lock_pending();
            if pending.closed {
                return Err(ProviderError::new(CONNECTION_CLOSED));
            }
            pending.waiting.insert(request_id, tx);
        }

        let command = SidecarCommand::Send {
            request_id,
            target: target.to_string(),
            message: message.to_string(),
        };
        if let Err(e) = self.send_json(&command).await {
            self.lock_pending().waiting.remove(&request_id);
            return Err(ProviderError::new(format!("failed to reach provider: {e}")));
        }

        rx.await
            .unwrap_or_else(|_| Err(ProviderError::new(CONNECTION_CLOSED)))
    }

    async fn send_json<T: serde::Serialize>(&self, message: &T) -> Result<(), ProtocolError> {
        let json = serde_json::to_string(message)?;
        let mut writer = self.writer.lock().await;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }
}
