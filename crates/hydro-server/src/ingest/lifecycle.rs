use crate::rtc::ConnectionState;
use hydro_protocol::StreamState;

/// Lifecycle of a published stream, driven by its publisher's transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Pending,
    Active,
    Closing,
    Closed,
}

impl SessionState {
    /// Apply a transport state report
    pub fn next(self, transport: ConnectionState) -> SessionState {
        match (self, transport) {
            (SessionState::Closing | SessionState::Closed, _) => self,
            (_, state) if state.is_terminal() => SessionState::Closing,
            (SessionState::Pending, ConnectionState::Connected) => SessionState::Active,
            // Disconnected may still recover; the transport reports Failed if it doesn't
            _ => self,
        }
    }

    /// Teardown was requested
    pub fn begin_close(self) -> SessionState {
        match self {
            SessionState::Closed => SessionState::Closed,
            _ => SessionState::Closing,
        }
    }

    pub fn is_live(self) -> bool {
        matches!(self, SessionState::Pending | SessionState::Active)
    }
}

impl From<SessionState> for StreamState {
    fn from(state: SessionState) -> Self {
        match state {
            SessionState::Pending => StreamState::Pending,
            SessionState::Active => StreamState::Active,
            SessionState::Closing => StreamState::Closing,
            SessionState::Closed => StreamState::Closed,
        }
    }
}
