//! Background tasks behind a live stream
//!
//! One supervisor per publisher drives the session lifecycle from transport
//! events and owns the relay loop; one supervisor and one feedback drain per
//! viewer keep the viewer's transport alive until it reports a terminal state.

use super::{Session, SessionRegistry, SessionState};
use crate::rtc::{
    FeedbackChannel, InboundTrack, MediaKind, NegotiationSession, SharedTrack, TransportEvent,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Copy every packet of `inbound` into `track` in arrival order.
/// Returns the number of packets relayed once either side fails.
pub(crate) async fn relay_packets(
    stream_id: &str,
    inbound: Arc<dyn InboundTrack>,
    track: Arc<SharedTrack>,
) -> u64 {
    let mut relayed = 0u64;

    loop {
        let packet = match inbound.read_packet().await {
            Ok(packet) => packet,
            Err(e) => {
                tracing::info!(stream_id = %stream_id, relayed, "Ingest: track closed ({})", e);
                break;
            }
        };

        if let Err(e) = track.write_packet(packet) {
            tracing::warn!(stream_id = %stream_id, relayed, "Ingest: relay write failed: {}", e);
            break;
        }

        relayed += 1;
        if relayed == 1 {
            tracing::info!(stream_id = %stream_id, "Ingest: media flow started");
        }
    }

    relayed
}

/// Drive a registered session until its publisher goes away, then remove it
pub(crate) async fn supervise_publisher(
    registry: Arc<SessionRegistry>,
    session: Arc<Session>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) {
    let stream_id = session.stream_id().to_string();
    let mut relaying = false;

    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = session.closed() => break,
        };

        let Some(event) = event else {
            break;
        };

        match event {
            TransportEvent::Track(inbound) => {
                let kind = inbound.kind();
                if kind != MediaKind::Video {
                    tracing::debug!(stream_id = %stream_id, ?kind, "Ignoring non-video track");
                    continue;
                }
                if relaying {
                    tracing::debug!(stream_id = %stream_id, "Ignoring additional video track");
                    continue;
                }
                relaying = true;

                let registry = Arc::clone(&registry);
                let track = Arc::clone(session.track());
                let stream_id = stream_id.clone();
                tokio::spawn(async move {
                    relay_packets(&stream_id, inbound, track).await;
                    // A dead relay loop means the stream is over
                    registry.remove(&stream_id).await;
                });
            }
            TransportEvent::StateChanged(transport) => {
                let state = session.on_transport_state(transport);
                tracing::info!(stream_id = %stream_id, %transport, ?state, "RTC state change");

                if state == SessionState::Closing || state == SessionState::Closed {
                    registry.remove(&stream_id).await;
                    break;
                }
            }
        }
    }

    tracing::debug!(stream_id = %stream_id, "Publisher supervisor stopped");
}

/// Keep a viewer's transport alive until it reports failure or closure
pub(crate) async fn supervise_viewer(
    stream_id: String,
    viewer: Arc<dyn NegotiationSession>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) {
    while let Some(event) = events.recv().await {
        if let TransportEvent::StateChanged(state) = event {
            tracing::debug!(stream_id = %stream_id, %state, "Viewer state change");
            if state.is_terminal() {
                break;
            }
        }
    }

    if let Err(e) = viewer.close().await {
        tracing::debug!(stream_id = %stream_id, "Error closing viewer connection: {}", e);
    }
    tracing::info!(stream_id = %stream_id, "Viewer disconnected");
}

/// Read and discard the reverse feedback of an outbound attachment
pub(crate) async fn drain_feedback(feedback: Box<dyn FeedbackChannel>) {
    while feedback.read_feedback().await.is_ok() {}
}
