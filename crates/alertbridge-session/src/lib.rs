//! Session lifecycle management for the alert gateway.
//!
//! Provides:
//! - `LifecycleManager` - Readiness state machine and fixed-delay reconnection
//! - Provider implementations (in-memory)

pub mod manager;
pub mod provider;

pub use manager::LifecycleManager;
