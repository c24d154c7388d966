//! JSON response bodies of the HTTP surface.

use serde::{Deserialize, Serialize};

use crate::gateway::HealthReport;

/// Body of every `POST /send` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendResponse {
    /// Successful dispatch.
    #[must_use]
    pub fn sent() -> Self {
        Self {
            success: true,
            message: Some("sent".to_string()),
            error: None,
        }
    }

    /// Failed dispatch with a caller-facing description.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ready: bool,
    pub identity_name: Option<String>,
    pub identity_id: Option<String>,
}

impl From<HealthReport> for HealthResponse {
    fn from(report: HealthReport) -> Self {
        Self {
            ready: report.ready,
            identity_name: report.identity.as_ref().map(|i| i.name.clone()),
            identity_id: report.identity.as_ref().map(|i| i.id.clone()),
        }
    }
}
