//! Out-of-process session provider.
//!
//! Provides:
//! - Sidecar wire protocol (newline-delimited JSON over stdio)
//! - `ProtocolPeer` - Reader loop and request correlation
//! - `SidecarProvider` - `SessionProvider` backed by a child process
//! - Command building utilities

pub mod command;
pub mod peer;
pub mod protocol;
pub mod provider;

pub use command::{CommandBuilder, CommandParts};
pub use peer::ProtocolPeer;
pub use protocol::{SidecarCommand, SidecarEvent};
pub use provider::SidecarProvider;
