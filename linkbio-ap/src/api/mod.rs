//! HTTP control surface
//!
//! Every route either reads the engine's last published snapshot or sends
//! one command to the engine. Routes never touch the controller directly.

pub mod handlers;

use crate::playback::EngineHandle;
use crate::playlist::Playlist;
use crate::state::SharedState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    pub shared: Arc<SharedState>,
    pub playlist: Arc<Playlist>,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/playlist", get(handlers::get_playlist))
        // Playback control
        .route("/playback/state", get(handlers::get_playback_state))
        .route("/playback/play", post(handlers::play))
        .route("/playback/pause", post(handlers::pause))
        .route("/playback/toggle", post(handlers::toggle))
        .route("/playback/next", post(handlers::next))
        .route("/playback/previous", post(handlers::previous))
        .route("/playback/seek", post(handlers::seek))
        // Volume
        .route("/audio/volume", get(handlers::get_volume).post(handlers::set_volume))
        .route("/audio/mute", post(handlers::set_mute))
        // SSE event stream
        .route("/events", get(handlers::event_stream))
        .with_state(state)
        // The page embedding the player is served from another origin
        .layer(CorsLayer::permissive())
}
