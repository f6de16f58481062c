//! Presence and viewer-count reconciliation
//!
//! Every successful membership change emits one `viewer-count-update` to
//! the creator and every current viewer of the stream; no batching or
//! debouncing, correctness over volume. The count itself is maintained in
//! lockstep with the viewer set inside
//! [`StreamSession`](crate::session::StreamSession), so it always equals
//! the set cardinality and can never go negative: a decrement for a
//! non-member is rejected as a no-op before it reaches the count.

use crate::protocol::ServerEvent;
use crate::registry::ConnectionRegistry;
use crate::session::StreamSession;
use crate::state::ClosedSession;

/// Broadcast the authoritative viewer count to every member of a stream
///
/// Sent to the creator (dashboard) and all current viewers. Members that
/// raced a disconnect simply miss the update; their cleanup will correct
/// the count again.
pub fn broadcast_viewer_count(registry: &ConnectionRegistry, session: &StreamSession) {
    let event = ServerEvent::ViewerCountUpdate {
        stream_id: session.stream.clone(),
        count: session.viewer_count(),
    };

    registry.send_to(session.creator, event.clone());
    for viewer in session.viewers() {
        registry.send_to(viewer, event.clone());
    }

    tracing::debug!(
        stream = %session.stream,
        count = session.viewer_count(),
        "Viewer count broadcast"
    );
}

/// Notify the surviving viewers of a closed session that their stream ended
///
/// Associations were already cleared when the session closed; the
/// connections themselves stay registered with the platform.
pub fn notify_stream_ended(registry: &ConnectionRegistry, closed: &ClosedSession) {
    for viewer in &closed.viewers {
        registry.send_to(
            *viewer,
            ServerEvent::StreamEnded {
                stream_id: closed.stream.clone(),
            },
        );
    }

    if !closed.viewers.is_empty() {
        tracing::debug!(
            stream = %closed.stream,
            viewers = closed.viewers.len(),
            "Stream-ended notified"
        );
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::UnboundedReceiver;

    use crate::registry::{ConnectionId, Identity, OutboundSink, Role};
    use crate::router::{self, StreamId};
    use crate::state::CoreState;

    use super::*;

    fn add_connection(
        state: &mut CoreState,
        name: &str,
        role: Role,
    ) -> (ConnectionId, UnboundedReceiver<ServerEvent>) {
        let (sink, rx) = OutboundSink::channel();
        let id = state.registry.register(Identity::User(name.into()), role, sink);
        (id, rx)
    }

    fn counts(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<u32> {
        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ServerEvent::ViewerCountUpdate { count, .. } = event {
                seen.push(count);
            }
        }
        seen
    }

    #[test]
    fn test_count_equals_set_cardinality_through_burst() {
        let mut state = CoreState::new(8);
        let (creator, mut creator_rx) = add_connection(&mut state, "cora", Role::Creator);
        state.start_stream(creator, StreamId::new("s1")).expect("start");

        let stream = StreamId::new("s1");
        let mut viewers = Vec::new();
        for n in 0..5 {
            let (v, _rx) = add_connection(&mut state, &format!("v{}", n), Role::Viewer);
            viewers.push(v);
        }

        // Join burst with duplicates and stray leaves interleaved
        for &v in &viewers {
            router::handle_join(&mut state, v, stream.clone()).unwrap();
            router::handle_join(&mut state, v, stream.clone()).unwrap();
        }
        router::handle_leave(&mut state, viewers[0], &stream);
        router::handle_leave(&mut state, viewers[0], &stream);
        state.disconnect(viewers[1]);
        state.disconnect(viewers[1]);

        let session = state.sessions.get(&stream).unwrap();
        assert_eq!(session.viewer_count(), 3);
        assert_eq!(session.viewer_count() as usize, session.viewer_ids().len());

        // Creator observed 1,2,3,4,5 then the two departures; never a skip
        // and never a negative.
        let observed = counts(&mut creator_rx);
        assert_eq!(observed[..5], [1, 2, 3, 4, 5]);
        assert_eq!(observed[observed.len() - 1], 4);
    }

    #[test]
    fn test_count_broadcast_reaches_creator_and_all_viewers() {
        let mut state = CoreState::new(8);
        let (creator, mut creator_rx) = add_connection(&mut state, "cora", Role::Creator);
        state.start_stream(creator, StreamId::new("s1")).expect("start");

        let (v1, mut v1_rx) = add_connection(&mut state, "v1", Role::Viewer);
        let (v2, mut v2_rx) = add_connection(&mut state, "v2", Role::Viewer);
        router::handle_join(&mut state, v1, StreamId::new("s1")).unwrap();
        router::handle_join(&mut state, v2, StreamId::new("s1")).unwrap();

        assert_eq!(counts(&mut creator_rx), [1, 2]);
        // v1 saw both joins, v2 only its own
        assert_eq!(counts(&mut v1_rx), [1, 2]);
        assert_eq!(counts(&mut v2_rx), [2]);
    }

    #[test]
    fn test_stream_ended_notifies_each_survivor() {
        let mut state = CoreState::new(8);
        let (creator, _creator_rx) = add_connection(&mut state, "cora", Role::Creator);
        state.start_stream(creator, StreamId::new("s1")).expect("start");

        let (v1, mut v1_rx) = add_connection(&mut state, "v1", Role::Viewer);
        let (v2, mut v2_rx) = add_connection(&mut state, "v2", Role::Viewer);
        router::handle_join(&mut state, v1, StreamId::new("s1")).unwrap();
        router::handle_join(&mut state, v2, StreamId::new("s1")).unwrap();

        let closed = state.close_session(&StreamId::new("s1")).expect("closed");
        notify_stream_ended(&state.registry, &closed);

        for rx in [&mut v1_rx, &mut v2_rx] {
            let mut ended = false;
            while let Ok(event) = rx.try_recv() {
                if matches!(event, ServerEvent::StreamEnded { .. }) {
                    ended = true;
                }
            }
            assert!(ended);
        }
    }
}
