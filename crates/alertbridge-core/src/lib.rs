//! Core abstractions for the alert messaging session gateway.
//!
//! This crate provides the fundamental building blocks:
//! - `SessionState` / `SessionIdentity` - Readiness data model
//! - `StateCell` - Shared, internally synchronized state holder
//! - `SessionConfig` - Settings handed to the session provider
//! - Provider, event sink and pairing traits

pub mod config;
pub mod state;
pub mod traits;

pub use config::SessionConfig;
pub use state::{SessionIdentity, SessionSnapshot, SessionState, StateCell};
pub use traits::{
    LogPairingPresenter, PairingPresenter, ProviderError, SessionEvents, SessionProvider,
};
