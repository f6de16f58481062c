//! Outbound events toward connected clients

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chat::ChatEvent;
use crate::registry::ConnectionId;
use crate::router::StreamId;
use crate::transport::TransportKind;

/// Events the signaling core emits to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Registration acknowledgment carrying the assigned connection id
    #[serde(rename_all = "camelCase")]
    Connected { connection_id: ConnectionId },

    /// The stream is live; echoes the transport channel grant to the creator
    #[serde(rename_all = "camelCase")]
    StreamStarted {
        stream_id: StreamId,
        transport: TransportKind,
        channel: Option<String>,
        token: Option<String>,
    },

    /// A stream this connection was watching (or raced a join against) ended
    #[serde(rename_all = "camelCase")]
    StreamEnded { stream_id: StreamId },

    /// Authoritative viewer count after a membership change
    #[serde(rename_all = "camelCase")]
    ViewerCountUpdate { stream_id: StreamId, count: u32 },

    /// Tells the creator to initiate a handshake toward a new viewer
    #[serde(rename_all = "camelCase")]
    ViewerJoined {
        stream_id: StreamId,
        viewer_connection_id: ConnectionId,
    },

    /// Forwarded WebRTC offer
    #[serde(rename_all = "camelCase")]
    Offer { from: ConnectionId, payload: Value },

    /// Forwarded WebRTC answer
    #[serde(rename_all = "camelCase")]
    Answer { from: ConnectionId, payload: Value },

    /// Forwarded ICE candidate
    #[serde(rename_all = "camelCase")]
    IceCandidate { from: ConnectionId, payload: Value },

    /// Chat fan-out
    ChatMessage(ChatEvent),

    /// Tip notification fan-out; the token ledger is handled elsewhere
    TipReceived(ChatEvent),

    /// Recent chat replayed to a late joiner
    #[serde(rename_all = "camelCase")]
    ChatHistory {
        stream_id: StreamId,
        events: Vec<ChatEvent>,
    },

    /// Rejected operation, reported only to the originating connection
    #[serde(rename_all = "camelCase")]
    Error { code: String, message: String },
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::registry::Role;

    use super::*;

    #[test]
    fn test_viewer_count_wire_shape() {
        let text = serde_json::to_string(&ServerEvent::ViewerCountUpdate {
            stream_id: StreamId::new("s1"),
            count: 3,
        })
        .expect("encode");

        assert_eq!(
            text,
            r#"{"type":"viewer-count-update","streamId":"s1","count":3}"#
        );
    }

    #[test]
    fn test_chat_message_inlines_event_fields() {
        let event = ServerEvent::ChatMessage(ChatEvent {
            stream_id: StreamId::new("s1"),
            display_name: "vic".into(),
            role: Role::Viewer,
            text: "hello".into(),
            tip_amount: 0,
            timestamp: Utc::now(),
        });

        let value = serde_json::to_value(&event).expect("encode");
        assert_eq!(value["type"], "chat-message");
        assert_eq!(value["displayName"], "vic");
        assert_eq!(value["tipAmount"], 0);
    }

    #[test]
    fn test_error_round_trip() {
        let event = ServerEvent::Error {
            code: "not-a-member".into(),
            message: "Connection 9 is not a member of stream s1".into(),
        };

        let text = serde_json::to_string(&event).expect("encode");
        let decoded: ServerEvent = serde_json::from_str(&text).expect("decode");
        assert_eq!(decoded, event);
    }
}
