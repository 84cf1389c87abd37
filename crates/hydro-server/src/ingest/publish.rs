use super::relay::supervise_publisher;
use super::{CloseGuard, IngestService, Session};
use crate::error::Result;
use crate::rtc::{SharedTrack, TransportError};
use std::sync::Arc;
use uuid::Uuid;

/// Result of a successful publish
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub stream_id: String,
    pub answer_sdp: String,
}

impl IngestService {
    /// Admit a publisher: negotiate its inbound transport and register the
    /// stream. Nothing is registered unless negotiation succeeds.
    pub async fn publish(&self, owner_id: Uuid, offer_sdp: &str) -> Result<PublishOutcome> {
        let stream_id = Uuid::new_v4().to_string();

        // The track exists before anything can look the stream up
        let track = Arc::new(SharedTrack::new(&stream_id, self.viewer_queue_depth));

        let inbound = CloseGuard::new(self.engine.new_session().await.map_err(|e| {
            tracing::error!(stream_id = %stream_id, "WHIP: negotiation session creation failed: {}", e);
            e
        })?);

        // Subscribe before negotiating so no track or state event is missed;
        // events queue up until the supervisor starts
        let events = inbound.session().take_events().await.ok_or_else(|| {
            TransportError::Negotiation("event subscription already taken".to_string())
        })?;

        if let Err(e) = inbound.session().set_remote_offer(offer_sdp).await {
            tracing::warn!(stream_id = %stream_id, "WHIP: set remote description failed: {}", e);
            return Err(e.into());
        }

        let answer_sdp = match inbound.session().create_answer().await {
            Ok(sdp) => sdp,
            Err(e) => {
                tracing::error!(stream_id = %stream_id, "WHIP: answer failed: {}", e);
                return Err(e.into());
            }
        };

        let session = Arc::new(Session::new(
            stream_id.clone(),
            owner_id,
            inbound.disarm(),
            track,
        ));
        self.registry.add(Arc::clone(&session)).await;

        tokio::spawn(supervise_publisher(
            Arc::clone(&self.registry),
            session,
            events,
        ));

        tracing::debug!(stream_id = %stream_id, owner_id = %owner_id, "WHIP session initialized");

        Ok(PublishOutcome {
            stream_id,
            answer_sdp,
        })
    }

    /// Explicit teardown of a stream. Returns false if it was not registered.
    pub async fn end_stream(&self, stream_id: &str) -> bool {
        self.registry.remove(stream_id).await
    }
}
