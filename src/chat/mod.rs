//! Chat and tip fan-out
//!
//! Accepts a chat or tip event scoped to a live stream, appends it to the
//! stream's bounded history, and broadcasts it to the creator and every
//! current viewer. Events for one stream are broadcast in `post_message`
//! invocation order; there is no cross-stream ordering guarantee.
//!
//! A non-zero tip amount carries no token-ledger side effect here; debits
//! and credits belong to the platform store behind
//! [`StreamDirectory`](crate::store::StreamDirectory).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::protocol::ServerEvent;
use crate::registry::{ConnectionId, Role};
use crate::router::StreamId;
use crate::session::SessionError;
use crate::state::CoreState;

/// Limits applied to chat posts
#[derive(Debug, Clone, Copy)]
pub struct ChatLimits {
    /// Maximum text length in bytes; longer texts are truncated on a
    /// char boundary
    pub max_text_len: usize,
}

impl Default for ChatLimits {
    fn default() -> Self {
        Self { max_text_len: 512 }
    }
}

/// A chat message or tip, scoped to one stream
///
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEvent {
    /// Stream the event belongs to
    pub stream_id: StreamId,
    /// Sender's display name
    pub display_name: String,
    /// Sender's role
    pub role: Role,
    /// Message text
    pub text: String,
    /// Tip amount in tokens; 0 = plain chat
    pub tip_amount: u64,
    /// When the event was accepted
    pub timestamp: DateTime<Utc>,
}

impl ChatEvent {
    /// Check whether this event carries a tip
    pub fn is_tip(&self) -> bool {
        self.tip_amount > 0
    }
}

/// Append a chat or tip event to a live stream and broadcast it
///
/// Fails with `NoSuchStream` if the stream is not live and `NotAMember`
/// if the sender is neither the creator nor a member viewer. On success
/// the event lands in the bounded history (evicting the oldest entry at
/// capacity) and is queued for the creator and every current viewer.
pub fn post_message(
    state: &mut CoreState,
    from: ConnectionId,
    stream: StreamId,
    text: String,
    tip_amount: u64,
    limits: ChatLimits,
) -> Result<ChatEvent, SessionError> {
    let sender = state
        .registry
        .get(from)
        .ok_or_else(|| SessionError::NotAMember {
            connection: from,
            stream: stream.clone(),
        })?;
    let display_name = sender.display_name().to_string();
    let role = sender.role;

    let session = state
        .sessions
        .get_mut(&stream)
        .ok_or_else(|| SessionError::NoSuchStream(stream.clone()))?;

    if !session.is_member(from) {
        return Err(SessionError::NotAMember {
            connection: from,
            stream,
        });
    }

    let event = ChatEvent {
        stream_id: stream.clone(),
        display_name,
        role,
        text: bound_text(text, limits.max_text_len),
        tip_amount,
        timestamp: Utc::now(),
    };

    if session.history.push(event.clone()).is_some() {
        tracing::trace!(stream = %stream, "Chat history full, oldest entry evicted");
    }

    let outbound = if event.is_tip() {
        ServerEvent::TipReceived(event.clone())
    } else {
        ServerEvent::ChatMessage(event.clone())
    };

    state.registry.send_to(session.creator, outbound.clone());
    for viewer in session.viewers() {
        state.registry.send_to(viewer, outbound.clone());
    }

    tracing::debug!(
        stream = %stream,
        connection = %from,
        tip = tip_amount,
        "Chat event fanned out"
    );
    Ok(event)
}

/// Truncate text to `max_len` bytes without splitting a character
fn bound_text(text: String, max_len: usize) -> String {
    if text.len() <= max_len {
        return text;
    }

    let mut end = max_len;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }

    let mut text = text;
    text.truncate(end);
    text
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::UnboundedReceiver;

    use crate::registry::{Identity, OutboundSink};
    use crate::router;

    use super::*;

    fn setup() -> (
        CoreState,
        ConnectionId,
        UnboundedReceiver<ServerEvent>,
        ConnectionId,
        UnboundedReceiver<ServerEvent>,
    ) {
        let mut state = CoreState::new(6);

        let (creator_sink, creator_rx) = OutboundSink::channel();
        let creator =
            state
                .registry
                .register(Identity::User("cora".into()), Role::Creator, creator_sink);
        state.start_stream(creator, StreamId::new("s1")).expect("start");

        let (viewer_sink, viewer_rx) = OutboundSink::channel();
        let viewer = state
            .registry
            .register(Identity::User("vic".into()), Role::Viewer, viewer_sink);
        router::handle_join(&mut state, viewer, StreamId::new("s1")).expect("join");

        (state, creator, creator_rx, viewer, viewer_rx)
    }

    fn chat_texts(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<String> {
        let mut texts = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                ServerEvent::ChatMessage(e) | ServerEvent::TipReceived(e) => texts.push(e.text),
                _ => {}
            }
        }
        texts
    }

    #[test]
    fn test_chat_reaches_creator_and_viewers() {
        let (mut state, _creator, mut creator_rx, viewer, mut viewer_rx) = setup();

        let event = post_message(
            &mut state,
            viewer,
            StreamId::new("s1"),
            "hello".into(),
            0,
            ChatLimits::default(),
        )
        .expect("post");

        assert!(!event.is_tip());
        assert_eq!(event.display_name, "vic");
        assert_eq!(chat_texts(&mut creator_rx), ["hello"]);
        assert_eq!(chat_texts(&mut viewer_rx), ["hello"]);
    }

    #[test]
    fn test_tip_is_fanned_out_as_tip_received() {
        let (mut state, _creator, mut creator_rx, viewer, _viewer_rx) = setup();

        post_message(
            &mut state,
            viewer,
            StreamId::new("s1"),
            "great stream!".into(),
            50,
            ChatLimits::default(),
        )
        .expect("post");

        let mut tip_seen = false;
        while let Ok(event) = creator_rx.try_recv() {
            if let ServerEvent::TipReceived(e) = event {
                assert_eq!(e.tip_amount, 50);
                tip_seen = true;
            }
        }
        assert!(tip_seen);
    }

    #[test]
    fn test_chat_to_dead_stream_is_no_such_stream() {
        let (mut state, _creator, _creator_rx, viewer, _viewer_rx) = setup();

        let result = post_message(
            &mut state,
            viewer,
            StreamId::new("s_unknown"),
            "hi".into(),
            0,
            ChatLimits::default(),
        );
        assert!(matches!(result, Err(SessionError::NoSuchStream(_))));
    }

    #[test]
    fn test_chat_from_non_member_is_rejected() {
        let (mut state, _creator, _creator_rx, _viewer, _viewer_rx) = setup();

        let (sink, _rx) = OutboundSink::channel();
        let stranger = state
            .registry
            .register(Identity::Guest("g-1".into()), Role::Viewer, sink);

        let result = post_message(
            &mut state,
            stranger,
            StreamId::new("s1"),
            "hi".into(),
            0,
            ChatLimits::default(),
        );
        assert!(matches!(result, Err(SessionError::NotAMember { .. })));
    }

    #[test]
    fn test_seventh_message_evicts_first_at_capacity_six() {
        let (mut state, _creator, _creator_rx, viewer, mut viewer_rx) = setup();

        for n in 1..=7 {
            post_message(
                &mut state,
                viewer,
                StreamId::new("s1"),
                format!("m{}", n),
                0,
                ChatLimits::default(),
            )
            .expect("post");
        }

        let session = state.sessions.get(&StreamId::new("s1")).unwrap();
        assert_eq!(session.history.len(), 6);

        let texts: Vec<String> = session
            .history
            .snapshot()
            .into_iter()
            .map(|e| e.text)
            .collect();
        assert_eq!(texts, ["m2", "m3", "m4", "m5", "m6", "m7"]);

        // Live viewers still received every message including the 7th
        let delivered = chat_texts(&mut viewer_rx);
        assert_eq!(delivered.len(), 7);
        assert_eq!(delivered.last().unwrap(), "m7");
    }

    #[test]
    fn test_text_is_bounded_on_char_boundary() {
        let (mut state, _creator, _creator_rx, viewer, _viewer_rx) = setup();

        let event = post_message(
            &mut state,
            viewer,
            StreamId::new("s1"),
            "héllo wörld".into(),
            0,
            ChatLimits { max_text_len: 7 },
        )
        .expect("post");

        assert!(event.text.len() <= 7);
        assert!(event.text.starts_with("héllo"));
    }

    #[test]
    fn test_bound_text_never_splits_chars() {
        assert_eq!(bound_text("abcdef".into(), 4), "abcd");
        assert_eq!(bound_text("ábcd".into(), 1), "");
        assert_eq!(bound_text("short".into(), 512), "short");
    }
}
