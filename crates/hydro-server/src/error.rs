use crate::rtc::TransportError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hydro_protocol::ErrorBody;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Access denied")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    BadRequest(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            // The remote side sent a description the transport refused to apply
            AppError::Transport(TransportError::InvalidDescription(msg)) => {
                (StatusCode::BAD_REQUEST, format!("Invalid session description: {}", msg))
            }
            AppError::Transport(TransportError::GatheringTimeout(_)) => (
                StatusCode::GATEWAY_TIMEOUT,
                "Candidate gathering did not complete".to_string(),
            ),
            AppError::Transport(e) => {
                tracing::error!("Transport error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Media transport unavailable".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Jwt(_) => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_client_errors_map_to_4xx() {
        assert_eq!(status_of(AppError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AppError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(AppError::NotFound("Stream not found".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::BadRequest("empty offer".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(TransportError::InvalidDescription("bad sdp".into()).into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_transport_failures_map_to_5xx() {
        assert_eq!(
            status_of(TransportError::Construction("no ports".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(
                TransportError::GatheringTimeout(std::time::Duration::from_secs(5)).into()
            ),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(AppError::Internal(anyhow::anyhow!("boom"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
