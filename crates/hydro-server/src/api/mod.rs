mod ingest;

use crate::state::AppState;
use axum::{
    http::header::LOCATION,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    // Browser players need to read Location on the publish response
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([LOCATION]);

    let api = Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }))
        // Publish (WHIP)
        .route("/ingest/whip", post(ingest::publish))
        .route("/ingest/whip/{id}", delete(ingest::end_stream))
        // Playback (WHEP)
        .route("/ingest/whep", post(ingest::play))
        .route("/ingest/whep/{id}", post(ingest::play_by_path))
        // Directory
        .route("/ingest/streams", get(ingest::list_streams));

    Router::new()
        .nest(hydro_protocol::API_PREFIX, api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtc::{LazyEngine, NegotiationEngine};
    use crate::state::Config;
    use axum::{body::Body, http::Request, http::StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router() -> Router {
        let config = Config::default();
        // Never asked for a session here, so no ports get bound
        let engine: Arc<dyn NegotiationEngine> = Arc::new(LazyEngine::new(config.rtc.clone()));
        create_router(AppState::new(config, engine))
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = router()
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = router()
            .oneshot(Request::get("/api/v1/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let response = router()
            .oneshot(Request::get("/api/v1/ingest/streams").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"[]");
    }
}
