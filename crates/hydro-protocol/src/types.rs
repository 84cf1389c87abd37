use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Directory entry for one live stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamInfo {
    pub stream_id: String,
    pub owner_id: Uuid,
    pub state: StreamState,
    pub started_at: DateTime<Utc>,
    /// WHEP endpoint viewers post their offer to
    pub playback_url: String,
}

/// Lifecycle of a published stream as seen by viewers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    /// Answer sent, publisher transport not connected yet
    #[default]
    Pending,
    /// Publisher transport connected
    Active,
    /// Teardown in progress
    Closing,
    Closed,
}

impl std::fmt::Display for StreamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamState::Pending => write!(f, "pending"),
            StreamState::Active => write!(f, "active"),
            StreamState::Closing => write!(f, "closing"),
            StreamState::Closed => write!(f, "closed"),
        }
    }
}

/// JSON body of every error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
