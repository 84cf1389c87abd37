use super::{RtpPacket, SharedTrack, TransportError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;

/// Connection state reported by a negotiation session's transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl ConnectionState {
    /// No further media will flow once a transport reaches one of these
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Failed | ConnectionState::Closed)
    }
}

impl From<RTCPeerConnectionState> for ConnectionState {
    fn from(state: RTCPeerConnectionState) -> Self {
        match state {
            RTCPeerConnectionState::Unspecified | RTCPeerConnectionState::New => {
                ConnectionState::New
            }
            RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
            RTCPeerConnectionState::Connected => ConnectionState::Connected,
            RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
            RTCPeerConnectionState::Failed => ConnectionState::Failed,
            RTCPeerConnectionState::Closed => ConnectionState::Closed,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::New => "new",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Failed => "failed",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
    Unknown,
}

impl From<RTPCodecType> for MediaKind {
    fn from(kind: RTPCodecType) -> Self {
        match kind {
            RTPCodecType::Audio => MediaKind::Audio,
            RTPCodecType::Video => MediaKind::Video,
            _ => MediaKind::Unknown,
        }
    }
}

/// Events a negotiation session pushes to whoever subscribed to it
#[derive(Clone)]
pub enum TransportEvent {
    /// The remote side started sending a track
    Track(Arc<dyn InboundTrack>),
    StateChanged(ConnectionState),
}

impl std::fmt::Debug for TransportEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportEvent::Track(track) => write!(f, "Track({:?})", track.kind()),
            TransportEvent::StateChanged(state) => write!(f, "StateChanged({})", state),
        }
    }
}

/// Remote media track on a negotiation session
#[async_trait]
pub trait InboundTrack: Send + Sync {
    fn kind(&self) -> MediaKind;

    /// Next packet in arrival order. An error means the track is done.
    async fn read_packet(&self) -> Result<RtpPacket, TransportError>;
}

/// Reverse quality-of-service channel of an outbound attachment
#[async_trait]
pub trait FeedbackChannel: Send + Sync {
    /// Reads one batch of feedback and returns how many reports it held.
    /// An error means the attachment is gone.
    async fn read_feedback(&self) -> Result<usize, TransportError>;
}

/// One side of an offer/answer handshake
#[async_trait]
pub trait NegotiationSession: Send + Sync {
    /// Subscribes to transport events. Only the first caller gets the
    /// receiver; dropping it cancels the subscription.
    async fn take_events(&self) -> Option<mpsc::UnboundedReceiver<TransportEvent>>;

    async fn set_remote_offer(&self, sdp: &str) -> Result<(), TransportError>;

    /// Creates the answer, installs it as the local description and returns its SDP
    async fn create_answer(&self) -> Result<String, TransportError>;

    /// Resolves once address-candidate gathering has completed
    async fn gathering_complete(&self) -> Result<(), TransportError>;

    async fn local_description(&self) -> Option<String>;

    /// Sends `track` to the remote side of this session
    async fn attach_outbound(
        &self,
        track: &Arc<SharedTrack>,
    ) -> Result<Box<dyn FeedbackChannel>, TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}

/// Factory for negotiation sessions
#[async_trait]
pub trait NegotiationEngine: Send + Sync {
    async fn new_session(&self) -> Result<Arc<dyn NegotiationSession>, TransportError>;
}
