//! Session provider backed by a sidecar process.

use std::{
    process::Stdio,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use alertbridge_core::{
    SessionConfig, SessionIdentity,
    traits::{ProviderError, SessionEvents, SessionProvider},
};
use async_trait::async_trait;
use command_group::{AsyncCommandGroup, AsyncGroupChild};
use tokio::task::JoinHandle;

use crate::{command::CommandBuilder, peer::ProtocolPeer};

struct Connection {
    child: AsyncGroupChild,
    peer: ProtocolPeer,
    reader: JoinHandle<()>,
}

impl Connection {
    /// Stop the reader before killing the child so its exit is not reported as a disconnect.
    fn shutdown(self) {
        let Self {
            mut child,
            peer,
            reader,
        } = self;
        reader.abort();
        peer.close();
        if let Err(e) = child.start_kill() {
            tracing::debug!("Failed to kill sidecar: {e}");
        }
        tokio::spawn(async move {
            let _ = child.wait().await;
        });
    }
}

/// Provider that runs the messaging session in a separate process.
///
/// Each initialize spawns the configured command in its own process group,
/// replacing any previous one, and talks to it over stdin/stdout. Its stderr
/// is inherited so the sidecar's own diagnostics stay visible.
pub struct SidecarProvider {
    command: CommandBuilder,
    connection: Mutex<Option<Connection>>,
}

impl SidecarProvider {
    #[must_use]
    pub const fn new(command: CommandBuilder) -> Self {
        Self {
            command,
            connection: Mutex::new(None),
        }
    }

    fn lock_connection(&self) -> MutexGuard<'_, Option<Connection>> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn active_peer(&self) -> Option<ProtocolPeer> {
        self.lock_connection().as_ref().map(|c| c.peer.clone())
    }

    async fn spawn_child(
        &self,
        events: Arc<dyn SessionEvents>,
    ) -> Result<Connection, ProviderError> {
        let (program, args) = self
            .command
            .build()
            .map_err(|e| ProviderError::new(e.to_string()))?
            .into_resolved()
            .await
            .map_err(|e| ProviderError::new(e.to_string()))?;

        tracing::info!(program = %program.display(), ?args, "Spawning session sidecar");

        let mut child = tokio::process::Command::new(&program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .group_spawn()
            .map_err(|e| ProviderError::new(format!("failed to spawn sidecar: {e}")))?;

        let stdin = child.inner().stdin.take();
        let stdout = child.inner().stdout.take();
        let (Some(stdin), Some(stdout)) = (stdin, stdout) else {
            let _ = child.start_kill();
            return Err(ProviderError::new("sidecar stdio unavailable"));
        };

        let (peer, reader) = ProtocolPeer::spawn(stdout, stdin, events);
        Ok(Connection {
            child,
            peer,
            reader,
        })
    }
}

#[async_trait]
impl SessionProvider for SidecarProvider {
    async fn initialize(
        &self,
        config: &SessionConfig,
        events: Arc<dyn SessionEvents>,
    ) -> Result<(), ProviderError> {
        let previous = self.lock_connection().take();
        if let Some(previous) = previous {
            tracing::debug!("Replacing previous sidecar");
            previous.shutdown();
        }

        let connection = self.spawn_child(events).await?;
        if let Err(e) = connection.peer.initialize(config).await {
            connection.shutdown();
            return Err(ProviderError::new(format!("failed to initialize sidecar: {e}")));
        }

        *self.lock_connection() = Some(connection);
        Ok(())
    }

    async fn send_message(&self, target: &str, message: &str) -> Result<(), ProviderError> {
        let peer = self
            .active_peer()
            .ok_or_else(|| ProviderError::new("provider not initialized"))?;
        peer.send_message(target, message).await
    }

    fn current_identity(&self) -> Option<SessionIdentity> {
        self.active_peer()
            .and_then(|peer| peer.current_identity())
    }
}
