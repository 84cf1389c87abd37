//! Hydro Server Library
//!
//! This module exposes the server components for testing and embedding.

pub mod api;
pub mod auth;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod rtc;
pub mod state;

use anyhow::Result;
use rtc::{LazyEngine, NegotiationEngine};
use std::sync::Arc;

/// Create and configure the server application.
///
/// The media engine binds its ports on the first publish or playback, not here.
pub fn create_app(config: state::Config) -> Result<(axum::Router, state::AppState)> {
    let engine = Arc::new(LazyEngine::new(config.rtc.clone()));
    create_app_with_engine(config, engine)
}

/// Same as [`create_app`] with a caller-supplied negotiation engine
pub fn create_app_with_engine(
    config: state::Config,
    engine: Arc<dyn NegotiationEngine>,
) -> Result<(axum::Router, state::AppState)> {
    let app_state = state::AppState::new(config, engine);
    let router = api::create_router(app_state.clone());
    Ok((router, app_state))
}
