use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::ingest::parse_offer;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use hydro_protocol::{whip_resource, StreamInfo, SDP_CONTENT_TYPE};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PlayQuery {
    pub stream_id: Option<String>,
}

pub async fn publish(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Bytes,
) -> Result<Response> {
    let offer = parse_offer(&body)?;
    let outcome = state.ingest.publish(auth.user_id, offer).await?;

    Ok((
        StatusCode::CREATED,
        [
            (header::CONTENT_TYPE, SDP_CONTENT_TYPE.to_string()),
            (header::LOCATION, whip_resource(&outcome.stream_id)),
        ],
        outcome.answer_sdp,
    )
        .into_response())
}

pub async fn end_stream(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let session = state
        .ingest
        .registry()
        .get(&id)
        .await
        .ok_or_else(|| AppError::NotFound("Stream not found".to_string()))?;

    if session.owner_id() != auth.user_id && !auth.is_admin() {
        tracing::info!(
            stream_id = %id,
            user_id = %auth.user_id,
            "Refusing to end a stream owned by someone else"
        );
        return Err(AppError::Forbidden);
    }

    // Lost a race with the transport closing it
    if !state.ingest.end_stream(&id).await {
        return Err(AppError::NotFound("Stream not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn play(
    State(state): State<AppState>,
    Query(query): Query<PlayQuery>,
    body: Bytes,
) -> Result<Response> {
    let stream_id = query
        .stream_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::NotFound("Stream not found or not ready".to_string()))?;

    answer_viewer(&state, &stream_id, &body).await
}

pub async fn play_by_path(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PlayQuery>,
    body: Bytes,
) -> Result<Response> {
    // The query parameter wins when both are given
    let stream_id = query.stream_id.filter(|s| !s.is_empty()).unwrap_or(id);

    answer_viewer(&state, &stream_id, &body).await
}

async fn answer_viewer(state: &AppState, stream_id: &str, body: &[u8]) -> Result<Response> {
    let answer_sdp = state.ingest.play(stream_id, body).await?;

    Ok((
        StatusCode::CREATED,
        [(header::CONTENT_TYPE, SDP_CONTENT_TYPE)],
        answer_sdp,
    )
        .into_response())
}

pub async fn list_streams(State(state): State<AppState>) -> Json<Vec<StreamInfo>> {
    Json(state.ingest.list_streams().await)
}
