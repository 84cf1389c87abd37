use super::SessionState;
use crate::rtc::{ConnectionState, NegotiationSession, SharedTrack};
use chrono::{DateTime, Utc};
use hydro_protocol::{whep_resource, StreamInfo};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// One live publish-to-many-viewers relationship
pub struct Session {
    stream_id: String,
    owner_id: Uuid,
    started_at: DateTime<Utc>,
    /// Publisher transport; closing it ends the session
    inbound: Arc<dyn NegotiationSession>,
    /// Fan-out point every viewer attaches to
    track: Arc<SharedTrack>,
    state: watch::Sender<SessionState>,
    released: AtomicBool,
}

impl Session {
    pub fn new(
        stream_id: String,
        owner_id: Uuid,
        inbound: Arc<dyn NegotiationSession>,
        track: Arc<SharedTrack>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Pending);
        Self {
            stream_id,
            owner_id,
            started_at: Utc::now(),
            inbound,
            track,
            state,
            released: AtomicBool::new(false),
        }
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    pub fn track(&self) -> &Arc<SharedTrack> {
        &self.track
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Wait until the session is fully closed
    pub async fn closed(&self) {
        let mut state = self.state.subscribe();
        let _ = state.wait_for(|s| *s == SessionState::Closed).await;
    }

    /// Feed a transport report into the lifecycle; returns the new state
    pub fn on_transport_state(&self, transport: ConnectionState) -> SessionState {
        let mut next = SessionState::Pending;
        self.state.send_modify(|state| {
            *state = state.next(transport);
            next = *state;
        });
        next
    }

    /// Close the shared track and the publisher transport. Safe to call more than once.
    pub async fn close(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }

        self.state.send_modify(|state| *state = state.begin_close());

        self.track.close();
        if let Err(e) = self.inbound.close().await {
            tracing::warn!(stream_id = %self.stream_id, "Error closing publisher connection: {}", e);
        }

        self.state.send_replace(SessionState::Closed);
    }

    pub fn info(&self) -> StreamInfo {
        StreamInfo {
            stream_id: self.stream_id.clone(),
            owner_id: self.owner_id,
            state: self.state().into(),
            started_at: self.started_at,
            playback_url: whep_resource(&self.stream_id),
        }
    }
}
