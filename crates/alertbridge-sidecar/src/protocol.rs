//! Wire protocol between the gateway and the sidecar process.
//!
//! One JSON object per line in each direction, tagged by `type`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message from the gateway to the sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SidecarCommand {
    /// Start the messaging session using stored credentials at `data_path`.
    Initialize { client_id: String, data_path: String },
    /// Send a text message.
    Send {
        request_id: Uuid,
        target: String,
        message: String,
    },
}

/// Message from the sidecar to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SidecarEvent {
    /// Pairing code to show to the operator.
    Qr { code: String },
    /// Credentials accepted.
    Authenticated,
    /// Session ready.
    Ready { name: String, id: String },
    /// Credentials rejected.
    AuthFailure {
        #[serde(default)]
        reason: String,
    },
    /// Transport lost.
    Disconnected {
        #[serde(default)]
        reason: String,
    },
    /// Outcome of a `send` command.
    SendResult {
        request_id: Uuid,
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_command_shape() {
        let request_id = Uuid::nil();
        let json = serde_json::to_value(SidecarCommand::Send {
            request_id,
            target: "g1".into(),
            message: "hi".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "send");
        assert_eq!(json["target"], "g1");
        assert_eq!(json["request_id"], request_id.to_string());
    }

    #[test]
    fn test_parse_lifecycle_events() {
        let ready: SidecarEvent =
            serde_json::from_str(r#"{"type":"ready","name":"Ops","id":"5511999999999"}"#).unwrap();
        assert_eq!(
            ready,
            SidecarEvent::Ready {
                name: "Ops".into(),
                id: "5511999999999".into()
            }
        );

        let disconnected: SidecarEvent = serde_json::from_str(r#"{"type":"disconnected"}"#).unwrap();
        assert_eq!(
            disconnected,
            SidecarEvent::Disconnected {
                reason: String::new()
            }
        );
    }

    #[test]
    fn test_parse_failed_send_result() {
        let line = format!(
            r#"{{"type":"send_result","request_id":"{}","ok":false,"error":"number not registered"}}"#,
            Uuid::nil()
        );
        let event: SidecarEvent = serde_json::from_str(&line).unwrap();
        let SidecarEvent::SendResult { ok, error, .. } = event else {
            panic!("Wrong event type");
        };
        assert!(!ok);
        assert_eq!(error.as_deref(), Some("number not registered"));
    }
}
