//! In-memory catalog of live sessions
//!
//! The lock only ever guards the map. Transport calls (closing a publisher
//! connection) happen after the lock is released so a slow teardown never
//! blocks lookups from viewers.

use super::Session;
use hydro_protocol::StreamInfo;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a session under its stream identifier
    pub async fn add(&self, session: Arc<Session>) {
        let stream_id = session.stream_id().to_string();
        let owner_id = session.owner_id();

        self.sessions.write().await.insert(stream_id.clone(), session);

        tracing::info!(stream_id = %stream_id, owner_id = %owner_id, "New streaming session started");
    }

    /// Remove a session and release its transport. Removing an unknown id is
    /// a no-op; returns whether anything was removed.
    pub async fn remove(&self, stream_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(stream_id);

        match removed {
            Some(session) => {
                session.close().await;
                tracing::info!(stream_id = %stream_id, "Streaming session closed");
                true
            }
            None => false,
        }
    }

    pub async fn get(&self, stream_id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(stream_id).cloned()
    }

    /// Point-in-time snapshot for discovery
    pub async fn list(&self) -> Vec<StreamInfo> {
        let sessions: Vec<Arc<Session>> = self.sessions.read().await.values().cloned().collect();

        let mut streams: Vec<StreamInfo> = sessions.iter().map(|s| s.info()).collect();
        streams.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        streams
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Remove and close every session (shutdown)
    pub async fn close_all(&self) {
        let sessions: Vec<(String, Arc<Session>)> = self.sessions.write().await.drain().collect();

        for (stream_id, session) in sessions {
            session.close().await;
            tracing::info!(stream_id = %stream_id, "Streaming session closed on shutdown");
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
