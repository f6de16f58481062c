//! Signaling hub
//!
//! The hub is the single entry point the transport layer drives. It owns
//! the [`CoreState`] behind one write lock, so mutation and broadcast for
//! one inbound event complete before the next event for the same stream
//! is processed: counts and membership can never be observed mid-update.
//!
//! It also applies the propagation policy: errors from expected races
//! (late join after stop, duplicate leave or disconnect, forward to a
//! vanished peer) are absorbed as no-ops and logged at low severity;
//! protocol misuse (wrong role, routing on behalf of a stream the sender
//! is not part of) is rejected and reported back only to the originating
//! connection. No error here is fatal to the process.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::chat::{self, ChatEvent, ChatLimits};
use crate::presence;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::registry::{ConnectionId, Identity, OutboundSink, Role};
use crate::router::{self, Delivery, SignalingEnvelope, StreamId};
use crate::session::SessionError;
use crate::state::{ClosedSession, CoreState};
use crate::stats::HubStats;
use crate::store::{AllowAll, StreamDirectory};
use crate::transport::{AccessTokenProvider, ChannelGrant, LocalChannels, TransportKind};

/// Hub tunables
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Bounded per-stream chat history capacity
    pub history_capacity: usize,

    /// Maximum chat text length in bytes; longer texts are truncated
    pub max_chat_len: usize,

    /// Media transport streams run over
    pub transport: TransportKind,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            history_capacity: 64,
            max_chat_len: 512,
            transport: TransportKind::PeerToPeer,
        }
    }
}

impl HubConfig {
    /// Set the chat history capacity
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Set the maximum chat text length
    pub fn max_chat_len(mut self, len: usize) -> Self {
        self.max_chat_len = len;
        self
    }

    /// Set the media transport
    pub fn transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }
}

/// The real-time signaling and session-state coordinator
///
/// Thread-safe: share it behind an `Arc` and call from any number of
/// connection tasks.
pub struct SignalingHub {
    /// Registry + session table behind a single lock
    state: RwLock<CoreState>,

    /// Platform store boundary
    directory: Arc<dyn StreamDirectory>,

    /// Transport credential exchange
    tokens: Arc<dyn AccessTokenProvider>,

    /// Configuration
    config: HubConfig,

    /// Activity counters
    stats: HubStats,
}

impl SignalingHub {
    /// Create a hub with default collaborators (allow-all directory,
    /// local channel provider)
    pub fn new(config: HubConfig) -> Self {
        Self::with_collaborators(config, Arc::new(AllowAll), Arc::new(LocalChannels))
    }

    /// Create a hub with explicit collaborators
    pub fn with_collaborators(
        config: HubConfig,
        directory: Arc<dyn StreamDirectory>,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        Self {
            state: RwLock::new(CoreState::new(config.history_capacity)),
            directory,
            tokens,
            config,
            stats: HubStats::default(),
        }
    }

    /// Get the hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Get the activity counters
    pub fn stats(&self) -> &HubStats {
        &self.stats
    }

    /// Register a transport connection; never fails
    ///
    /// The assigned id is acknowledged on the connection's own sink so the
    /// client learns its address before any signaling can reference it.
    pub async fn connect(&self, identity: Identity, role: Role, sink: OutboundSink) -> ConnectionId {
        let mut state = self.state.write().await;
        let id = state.registry.register(identity, role, sink);
        state
            .registry
            .send_to(id, ServerEvent::Connected { connection_id: id });
        drop(state);

        self.stats
            .connections_opened
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        id
    }

    /// Tear down a connection and everything that depended on it
    ///
    /// The only cancellation signal: safe to call at any handshake phase
    /// and idempotent under duplicate disconnect events.
    pub async fn disconnect(&self, conn: ConnectionId) {
        let mut state = self.state.write().await;
        let cleanup = state.disconnect(conn);

        if cleanup.removed.is_none() {
            return;
        }
        self.stats
            .connections_closed
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        if let Some(stream) = &cleanup.left_stream {
            self.stats
                .viewers_left
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            if let Some(session) = state.sessions.get(stream) {
                presence::broadcast_viewer_count(&state.registry, session);
            }
        }

        if let Some(closed) = cleanup.closed_session {
            self.finish_close(&state, closed);
        }
    }

    /// Go live as the creator of `stream`
    ///
    /// Verifies the stream against the platform directory, performs the
    /// transport credential exchange when one is needed, then opens the
    /// session and acknowledges with `stream-started`.
    pub async fn start_stream(
        &self,
        conn: ConnectionId,
        stream: StreamId,
    ) -> Result<(), SessionError> {
        // Collaborator calls happen before the state lock is taken; their
        // latency must not stall the event loop.
        let identity = {
            let state = self.state.read().await;
            match state.registry.get(conn) {
                Some(c) if c.role == Role::Creator => c.identity.clone(),
                Some(_) => {
                    return Err(SessionError::UnauthorizedRole {
                        connection: conn,
                        required: Role::Creator,
                    })
                }
                None => {
                    return Err(SessionError::NotAMember {
                        connection: conn,
                        stream,
                    })
                }
            }
        };

        if !self.directory.authorize_stream(&stream, &identity).await {
            tracing::warn!(stream = %stream, identity = %identity, "Stream rejected by directory");
            return Err(SessionError::UnauthorizedRole {
                connection: conn,
                required: Role::Creator,
            });
        }

        let grant: Option<ChannelGrant> = match self.config.transport {
            TransportKind::PeerToPeer => None,
            kind => match self.tokens.grant(&stream, &identity, kind).await {
                Ok(grant) => Some(grant),
                Err(e) => {
                    tracing::error!(stream = %stream, error = %e, "Transport grant failed");
                    return Err(SessionError::UnauthorizedRole {
                        connection: conn,
                        required: Role::Creator,
                    });
                }
            },
        };

        let mut state = self.state.write().await;
        let started = match state.start_stream(conn, stream.clone()) {
            Ok(started) => started,
            Err(err) => {
                // A grant obtained for a start that lost the race must not
                // dangle at the transport.
                if let Some(grant) = grant {
                    self.revoke_grant(grant);
                }
                return Err(err);
            }
        };

        if let Some(replaced) = started.replaced {
            self.finish_close(&state, replaced);
        }

        if let Some(session) = state.sessions.get_mut(&stream) {
            session.grant = grant.clone();
        }

        let (channel, token) = match grant {
            Some(grant) => (Some(grant.channel), grant.token),
            None => (None, None),
        };
        state.registry.send_to(
            conn,
            ServerEvent::StreamStarted {
                stream_id: stream.clone(),
                transport: self.config.transport,
                channel,
                token,
            },
        );
        drop(state);

        self.stats
            .sessions_opened
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        tracing::info!(
            stream = %stream,
            connection = %conn,
            transport = %self.config.transport,
            "Stream live"
        );
        Ok(())
    }

    /// Stop a live stream; only its owning creator connection may
    pub async fn stop_stream(
        &self,
        conn: ConnectionId,
        stream: StreamId,
    ) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        let closed = state.stop_stream(conn, stream)?;
        self.finish_close(&state, closed);
        Ok(())
    }

    /// Subscribe a viewer to a live stream
    pub async fn join_stream(
        &self,
        conn: ConnectionId,
        stream: StreamId,
    ) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        let added = router::handle_join(&mut state, conn, stream)?;
        if added {
            self.stats
                .viewers_joined
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        Ok(())
    }

    /// Unsubscribe a viewer; no error if it was never a member
    pub async fn leave_stream(&self, conn: ConnectionId, stream: StreamId) {
        let mut state = self.state.write().await;
        if router::handle_leave(&mut state, conn, &stream) {
            self.stats
                .viewers_left
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    }

    /// Route one signaling envelope
    pub async fn signal(&self, envelope: SignalingEnvelope) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        let delivery = router::route(&mut state, envelope)?;
        drop(state);

        let counter = match delivery {
            Delivery::Forwarded => &self.stats.signals_forwarded,
            Delivery::Dropped => &self.stats.signals_dropped,
        };
        counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(())
    }

    /// Post a chat message or tip to a live stream
    pub async fn post_chat(
        &self,
        conn: ConnectionId,
        stream: StreamId,
        text: String,
        tip_amount: u64,
    ) -> Result<(), SessionError> {
        let limits = ChatLimits {
            max_text_len: self.config.max_chat_len,
        };

        let mut state = self.state.write().await;
        let event = chat::post_message(&mut state, conn, stream, text, tip_amount, limits)?;
        drop(state);

        let counter = if event.is_tip() {
            &self.stats.tips
        } else {
            &self.stats.chat_messages
        };
        counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        // Persistence is fire-and-forget and happens outside the lock
        self.directory.persist_chat(event);
        Ok(())
    }

    /// Apply one inbound client event
    ///
    /// This is the transport-facing entry point: it absorbs expected
    /// races and reports misuse back to the originator as an `error`
    /// event instead of returning it.
    pub async fn handle_event(&self, conn: ConnectionId, event: ClientEvent) {
        let result = match event {
            ClientEvent::Connect { .. } => {
                // The transport registers connections before events flow
                self.send_error(conn, "already-connected", "connection is already registered")
                    .await;
                return;
            }
            ClientEvent::StartStream { stream_id } => self.start_stream(conn, stream_id).await,
            ClientEvent::StopStream { stream_id } => self.stop_stream(conn, stream_id).await,
            ClientEvent::JoinStream { stream_id } => {
                match self.join_stream(conn, stream_id.clone()).await {
                    // A join that loses the race against stop is not a
                    // failure; tell the client the stream is over instead.
                    Err(SessionError::NoSuchStream(_)) => {
                        tracing::debug!(
                            stream = %stream_id,
                            connection = %conn,
                            "Join after stream ended, absorbed"
                        );
                        self.send(conn, ServerEvent::StreamEnded { stream_id }).await;
                        Ok(())
                    }
                    other => other,
                }
            }
            ClientEvent::LeaveStream { stream_id } => {
                self.leave_stream(conn, stream_id).await;
                Ok(())
            }
            ClientEvent::Offer { to, payload } => {
                self.signal(SignalingEnvelope::offer(conn, to, payload)).await
            }
            ClientEvent::Answer { to, payload } => {
                self.signal(SignalingEnvelope::answer(conn, to, payload)).await
            }
            ClientEvent::IceCandidate { to, payload } => {
                self.signal(SignalingEnvelope::ice_candidate(conn, to, payload))
                    .await
            }
            ClientEvent::ChatMessage { stream_id, text } => {
                self.post_chat(conn, stream_id, text, 0).await
            }
            ClientEvent::SendTip {
                stream_id,
                amount,
                message,
            } => {
                self.post_chat(conn, stream_id, message.unwrap_or_default(), amount)
                    .await
            }
        };

        if let Err(err) = result {
            self.stats
                .events_rejected
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            tracing::debug!(connection = %conn, error = %err, "Event rejected");
            self.send_error(conn, err.code(), &err.to_string()).await;
        }
    }

    /// Report a rejection to one connection only
    pub(crate) async fn send_error(&self, conn: ConnectionId, code: &str, message: &str) {
        self.send(
            conn,
            ServerEvent::Error {
                code: code.to_string(),
                message: message.to_string(),
            },
        )
        .await;
    }

    async fn send(&self, conn: ConnectionId, event: ServerEvent) {
        let state = self.state.read().await;
        state.registry.send_to(conn, event);
    }

    fn finish_close(&self, state: &CoreState, closed: ClosedSession) {
        presence::notify_stream_ended(&state.registry, &closed);
        self.stats
            .sessions_closed
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        if let Some(grant) = closed.grant {
            self.revoke_grant(grant);
        }
    }

    /// Revoke a transport credential without holding up the event loop
    fn revoke_grant(&self, grant: ChannelGrant) {
        let tokens = Arc::clone(&self.tokens);
        tokio::spawn(async move {
            tokens.revoke(grant).await;
        });
    }

    /// Current viewer count of a live stream
    pub async fn viewer_count(&self, stream: &StreamId) -> Option<u32> {
        let state = self.state.read().await;
        state.sessions.get(stream).map(|s| s.viewer_count())
    }

    /// Check whether a stream is live
    pub async fn is_live(&self, stream: &StreamId) -> bool {
        self.state.read().await.sessions.is_live(stream)
    }

    /// Number of registered connections
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.registry.len()
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }

    /// Chat history snapshot of a live stream
    pub async fn chat_history(&self, stream: &StreamId) -> Option<Vec<ChatEvent>> {
        let state = self.state.read().await;
        state.sessions.get(stream).map(|s| s.history.snapshot())
    }
}
