//! Streaming-transport capability
//!
//! The platform broadcasts over three competing transports: raw
//! peer-to-peer WebRTC, a commercial RTC SDK, and an RTMP ingest path with
//! HLS packaging. The signaling core stays transport-agnostic: the only
//! per-transport difference is the credential exchange on start/stop,
//! captured by [`AccessTokenProvider`]. The core treats the exchange as
//! opaque; it never implements the transport protocol itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::registry::Identity;
use crate::router::StreamId;

/// Which media transport a stream runs over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Direct WebRTC between creator and viewers; no external credential
    PeerToPeer,
    /// Commercial RTC SDK channel
    ManagedSdk,
    /// RTMP ingest with HLS packaging
    IngestRelay,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::PeerToPeer => write!(f, "peer-to-peer"),
            TransportKind::ManagedSdk => write!(f, "managed-sdk"),
            TransportKind::IngestRelay => write!(f, "ingest-relay"),
        }
    }
}

/// Opaque credential returned by a transport collaborator
///
/// Recorded in the stream session while the stream is live and revoked
/// when it ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelGrant {
    /// Transport the grant belongs to
    pub kind: TransportKind,
    /// Channel identifier at the transport
    pub channel: String,
    /// Access token, when the transport requires one
    pub token: Option<String>,
}

/// Failure to obtain a transport credential
#[derive(Debug, Clone)]
pub struct GrantError(pub String);

impl std::fmt::Display for GrantError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Transport grant failed: {}", self.0)
    }
}

impl std::error::Error for GrantError {}

/// Credential exchange with an external media transport
///
/// Implementations talk to the commercial SDK's token service or the
/// ingest server's key API; the signaling core only carries the result.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Request a channel credential for a stream about to go live
    async fn grant(
        &self,
        stream: &StreamId,
        creator: &Identity,
        kind: TransportKind,
    ) -> Result<ChannelGrant, GrantError>;

    /// Revoke a previously issued credential; best-effort
    async fn revoke(&self, grant: ChannelGrant);
}

/// Default provider: mints a channel named after the stream, no token
///
/// Keeps demos and tests self-contained when no external transport
/// service is wired in.
#[derive(Debug, Default, Clone)]
pub struct LocalChannels;

#[async_trait]
impl AccessTokenProvider for LocalChannels {
    async fn grant(
        &self,
        stream: &StreamId,
        _creator: &Identity,
        kind: TransportKind,
    ) -> Result<ChannelGrant, GrantError> {
        Ok(ChannelGrant {
            kind,
            channel: stream.as_str().to_string(),
            token: None,
        })
    }

    async fn revoke(&self, grant: ChannelGrant) {
        tracing::debug!(channel = %grant.channel, "Local channel released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_channels_grant() {
        let provider = LocalChannels;

        let grant = provider
            .grant(
                &StreamId::new("s1"),
                &Identity::User("cora".into()),
                TransportKind::IngestRelay,
            )
            .await
            .expect("grant");

        assert_eq!(grant.kind, TransportKind::IngestRelay);
        assert_eq!(grant.channel, "s1");
        assert!(grant.token.is_none());

        provider.revoke(grant).await;
    }
}
