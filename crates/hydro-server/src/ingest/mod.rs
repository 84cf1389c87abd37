//! Live ingest and relay
//!
//! A publisher pushes one stream in over WHIP; it is registered as a
//! [`Session`] whose shared track fans out to any number of WHEP viewers.
//! Sessions live only in process memory.

mod directory;
mod lifecycle;
mod playback;
mod publish;
mod registry;
mod relay;
mod session;

pub use lifecycle::SessionState;
pub use publish::PublishOutcome;
pub use registry::SessionRegistry;
pub use session::Session;

use crate::error::{AppError, Result};
use crate::rtc::{NegotiationEngine, NegotiationSession};
use crate::state::RtcConfig;
use std::sync::Arc;
use std::time::Duration;

/// Entry point for publish, playback and discovery
#[derive(Clone)]
pub struct IngestService {
    engine: Arc<dyn NegotiationEngine>,
    registry: Arc<SessionRegistry>,
    viewer_queue_depth: usize,
    gathering_timeout: Option<Duration>,
}

impl IngestService {
    pub fn new(
        engine: Arc<dyn NegotiationEngine>,
        registry: Arc<SessionRegistry>,
        config: &RtcConfig,
    ) -> Self {
        Self {
            engine,
            registry,
            viewer_queue_depth: config.viewer_queue_depth,
            gathering_timeout: config.gathering_timeout(),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }
}

/// Validate a raw offer body: UTF-8 and not blank
pub fn parse_offer(body: &[u8]) -> Result<&str> {
    let sdp = std::str::from_utf8(body)
        .map_err(|_| AppError::BadRequest("Offer is not valid UTF-8".to_string()))?;

    if sdp.trim().is_empty() {
        return Err(AppError::BadRequest("Empty offer".to_string()));
    }

    Ok(sdp)
}

/// Closes a negotiation session that never made it into service
struct CloseGuard {
    session: Arc<dyn NegotiationSession>,
    armed: bool,
}

impl CloseGuard {
    fn new(session: Arc<dyn NegotiationSession>) -> Self {
        Self {
            session,
            armed: true,
        }
    }

    fn session(&self) -> &Arc<dyn NegotiationSession> {
        &self.session
    }

    /// Hand the session over to its new owner
    fn disarm(mut self) -> Arc<dyn NegotiationSession> {
        self.armed = false;
        Arc::clone(&self.session)
    }
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let session = Arc::clone(&self.session);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = session.close().await {
                    tracing::debug!("Error closing abandoned negotiation session: {}", e);
                }
            });
        }
    }
}
