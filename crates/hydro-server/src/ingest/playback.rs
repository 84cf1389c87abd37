use super::relay::{drain_feedback, supervise_viewer};
use super::{parse_offer, CloseGuard, IngestService};
use crate::error::{AppError, Result};
use crate::rtc::TransportError;

impl IngestService {
    /// Attach a new viewer to a live stream and return the answer SDP with
    /// every gathered candidate inlined.
    ///
    /// The call does not return before candidate gathering has completed.
    /// Without a configured gathering timeout it waits for as long as the
    /// transport takes.
    ///
    /// The stream is looked up before the offer body is inspected, so an
    /// unknown stream is reported as not found whatever the body holds.
    pub async fn play(&self, stream_id: &str, offer: &[u8]) -> Result<String> {
        tracing::info!(stream_id = %stream_id, "WHEP: searching for stream");

        let track = match self.registry.get(stream_id).await {
            Some(session) if session.state().is_live() && !session.track().is_closed() => {
                session.track().clone()
            }
            _ => {
                tracing::warn!(stream_id = %stream_id, "WHEP: stream not found or no track");
                return Err(AppError::NotFound(
                    "Stream not found or not ready".to_string(),
                ));
            }
        };

        let offer_sdp = parse_offer(offer)?;

        let viewer = CloseGuard::new(self.engine.new_session().await.map_err(|e| {
            tracing::error!(stream_id = %stream_id, "WHEP: negotiation session creation failed: {}", e);
            e
        })?);
        let events = viewer.session().take_events().await;

        let feedback = viewer.session().attach_outbound(&track).await.map_err(|e| {
            tracing::error!(stream_id = %stream_id, "WHEP: failed to add track: {}", e);
            e
        })?;
        tokio::spawn(drain_feedback(feedback));

        if let Err(e) = viewer.session().set_remote_offer(offer_sdp).await {
            tracing::warn!(stream_id = %stream_id, "WHEP: set remote description failed: {}", e);
            return Err(e.into());
        }

        viewer.session().create_answer().await.map_err(|e| {
            tracing::error!(stream_id = %stream_id, "WHEP: answer failed: {}", e);
            e
        })?;

        match self.gathering_timeout {
            Some(limit) => tokio::time::timeout(limit, viewer.session().gathering_complete())
                .await
                .map_err(|_| {
                    tracing::warn!(stream_id = %stream_id, ?limit, "WHEP: candidate gathering timed out");
                    TransportError::GatheringTimeout(limit)
                })??,
            None => viewer.session().gathering_complete().await?,
        }

        let answer_sdp = viewer.session().local_description().await.ok_or_else(|| {
            TransportError::Negotiation("local description unavailable after gathering".to_string())
        })?;

        let viewer = viewer.disarm();
        if let Some(events) = events {
            tokio::spawn(supervise_viewer(stream_id.to_string(), viewer, events));
        }

        tracing::info!(
            stream_id = %stream_id,
            viewers = track.reader_count(),
            "WHEP: viewer connected"
        );
        Ok(answer_sdp)
    }
}
