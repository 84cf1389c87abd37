//! Media transport layer
//!
//! Everything that touches webrtc-rs lives here. The ingest core only sees the
//! traits in [`transport`] and the [`SharedTrack`] fan-out point, so it can be
//! driven by an in-memory transport in tests.

mod engine;
mod track;
mod transport;

pub use engine::{LazyEngine, RtcEngine, TransportModes};
pub use track::{SharedTrack, TrackSubscription};
pub use transport::{
    ConnectionState, FeedbackChannel, InboundTrack, MediaKind, NegotiationEngine,
    NegotiationSession, TransportEvent,
};

/// RTP packet as framed by the transport
pub use webrtc::rtp::packet::Packet as RtpPacket;

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("failed to allocate transport resources: {0}")]
    Construction(String),

    #[error("invalid session description: {0}")]
    InvalidDescription(String),

    #[error("negotiation failed: {0}")]
    Negotiation(String),

    #[error("failed to read from inbound track: {0}")]
    Read(String),

    #[error("failed to relay packet: {0}")]
    RelayWrite(String),

    #[error("candidate gathering did not complete within {0:?}")]
    GatheringTimeout(Duration),

    #[error("transport closed")]
    Closed,
}
