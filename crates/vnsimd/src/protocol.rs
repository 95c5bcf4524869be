//! WebSocket message envelope
//!
//! Every frame is a JSON text message `{"type": ..., "data": ...}`.
//! Clients send `control` and `uds-request`; the server sends `can-message`
//! and `uds-response`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vnsim_core::{ControlCommand, TelemetryFrame};
use vnsim_uds::{DiagnosticRequest, DiagnosticResponse};

/// Client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    Control(ControlCommand),
    UdsRequest(DiagnosticRequest),
}

/// Server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    CanMessage(TelemetryFrame),
    UdsResponse(DiagnosticResponse),
}

/// IDs recovered from a `uds-request` whose body does not decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedUdsRequest {
    pub service_id: u8,
    pub request_id: Option<u64>,
}

impl MalformedUdsRequest {
    /// Read `serviceId` and `requestId` from a raw envelope; `None` when the
    /// text is not a `uds-request` or carries no usable service ID
    pub fn salvage(text: &str) -> Option<Self> {
        let envelope: Value = serde_json::from_str(text).ok()?;
        if envelope.get("type")?.as_str()? != "uds-request" {
            return None;
        }
        let data = envelope.get("data")?;
        let service_id = u8::try_from(data.get("serviceId")?.as_u64()?).ok()?;
        let request_id = data.get("requestId").and_then(Value::as_u64);
        Some(Self {
            service_id,
            request_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_control() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "control",
            "data": { "action": "accelerate", "pressed": true }
        }))
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Control(ControlCommand::pressed("accelerate", true))
        );
    }

    #[test]
    fn test_parse_uds_request() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "uds-request",
            "data": { "serviceId": 0x19, "subFunction": 0x02, "payload": [0x08] }
        }))
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::UdsRequest(
                DiagnosticRequest::new(0x19)
                    .with_sub_function(0x02)
                    .with_payload([0x08])
            )
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result = serde_json::from_value::<ClientMessage>(json!({
            "type": "reboot",
            "data": {}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_response() {
        let msg = ServerMessage::UdsResponse(
            DiagnosticResponse::positive(0x14, vec![0x00]).with_request_id(Some(3)),
        );
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "uds-response",
                "data": { "serviceId": 0x54, "data": [0x00], "requestId": 3 }
            })
        );
    }

    #[test]
    fn test_salvage_undecodable_uds_request() {
        let text = r#"{"type":"uds-request","data":{"serviceId":34,"payload":[241,400],"requestId":9}}"#;
        assert!(serde_json::from_str::<ClientMessage>(text).is_err());
        assert_eq!(
            MalformedUdsRequest::salvage(text),
            Some(MalformedUdsRequest {
                service_id: 0x22,
                request_id: Some(9)
            })
        );
    }

    #[test]
    fn test_salvage_needs_service_id() {
        assert_eq!(MalformedUdsRequest::salvage("not json"), None);
        assert_eq!(
            MalformedUdsRequest::salvage(r#"{"type":"uds-request","data":{"serviceId":"x"}}"#),
            None
        );
        assert_eq!(
            MalformedUdsRequest::salvage(r#"{"type":"uds-request","data":{"serviceId":300}}"#),
            None
        );
        assert_eq!(
            MalformedUdsRequest::salvage(r#"{"type":"control","data":{"serviceId":16}}"#),
            None
        );
    }
}
