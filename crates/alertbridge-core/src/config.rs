//! Session settings passed through to the provider.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Default delay before reconnecting after a disconnect.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(10);

/// Settings for the single messaging session.
///
/// `client_id` and `data_path` address the provider's persisted credentials;
/// the gateway does not interpret them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Identifier of the stored session.
    pub client_id: String,

    /// Directory where the provider keeps session credentials.
    pub data_path: PathBuf,

    /// Fixed delay between a disconnect and the next initialize.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay: Duration,
}

const fn default_reconnect_delay() -> Duration {
    DEFAULT_RECONNECT_DELAY
}

impl SessionConfig {
    /// Create a config with the default reconnect delay.
    #[must_use]
    pub fn new(client_id: impl Into<String>, data_path: impl Into<PathBuf>) -> Self {
        Self {
            client_id: client_id.into(),
            data_path: data_path.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    /// Override the reconnect delay.
    #[must_use]
    pub const fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}
