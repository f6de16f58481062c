//! Inbound events from the transport layer
//!
//! The wire shape is the contract: internally tagged JSON with kebab-case
//! type names and camelCase fields. Signaling payloads are opaque blobs
//! carried as raw JSON values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::{ConnectionId, Identity, Role};
use crate::router::StreamId;

/// Events a client sends to the signaling core
///
/// The first frame on every socket must be `connect`; everything else is
/// valid only after registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Register on the platform
    #[serde(rename_all = "camelCase")]
    Connect { identity: Identity, role: Role },

    /// Go live as the creator of a stream
    #[serde(rename_all = "camelCase")]
    StartStream { stream_id: StreamId },

    /// Stop broadcasting
    #[serde(rename_all = "camelCase")]
    StopStream { stream_id: StreamId },

    /// Subscribe to a live stream as a viewer
    #[serde(rename_all = "camelCase")]
    JoinStream { stream_id: StreamId },

    /// Unsubscribe from a stream
    #[serde(rename_all = "camelCase")]
    LeaveStream { stream_id: StreamId },

    /// WebRTC offer for one viewer; payload passed through unexamined
    #[serde(rename_all = "camelCase")]
    Offer { to: ConnectionId, payload: Value },

    /// WebRTC answer back to the creator
    #[serde(rename_all = "camelCase")]
    Answer { to: ConnectionId, payload: Value },

    /// ICE candidate for either direction of a handshake
    #[serde(rename_all = "camelCase")]
    IceCandidate { to: ConnectionId, payload: Value },

    /// Chat message scoped to a live stream
    #[serde(rename_all = "camelCase")]
    ChatMessage { stream_id: StreamId, text: String },

    /// Tip with an optional message; token accounting happens elsewhere
    #[serde(rename_all = "camelCase")]
    SendTip {
        stream_id: StreamId,
        amount: u64,
        #[serde(default)]
        message: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_wire_shape() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"connect","identity":{"user":"alice"},"role":"viewer"}"#,
        )
        .expect("decode");

        assert_eq!(
            event,
            ClientEvent::Connect {
                identity: Identity::User("alice".into()),
                role: Role::Viewer,
            }
        );
    }

    #[test]
    fn test_join_stream_uses_camel_case_fields() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"join-stream","streamId":"s1"}"#).expect("decode");

        assert_eq!(
            event,
            ClientEvent::JoinStream {
                stream_id: StreamId::new("s1"),
            }
        );
    }

    #[test]
    fn test_offer_payload_is_opaque() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"offer","to":7,"payload":{"sdp":"v=0","type":"offer"}}"#,
        )
        .expect("decode");

        match event {
            ClientEvent::Offer { to, payload } => {
                assert_eq!(to, ConnectionId(7));
                assert_eq!(payload["sdp"], "v=0");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_send_tip_message_is_optional() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"send-tip","streamId":"s1","amount":100}"#)
                .expect("decode");

        assert_eq!(
            event,
            ClientEvent::SendTip {
                stream_id: StreamId::new("s1"),
                amount: 100,
                message: None,
            }
        );
    }
}
