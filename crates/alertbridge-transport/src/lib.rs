//! Dispatch gateway and HTTP surface.
//!
//! Provides:
//! - `DispatchGateway` - Readiness-gated send and health reads
//! - Wire protocol (JSON request and response bodies)
//! - HTTP router (feature: http)

pub mod gateway;
pub mod protocol;

#[cfg(feature = "http")]
pub mod http;

pub use gateway::{DispatchError, DispatchGateway, DispatchRequest, DispatchResult, HealthReport};
pub use protocol::{HealthResponse, SendResponse};
