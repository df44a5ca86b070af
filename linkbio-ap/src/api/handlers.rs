//! HTTP request handlers

use crate::api::AppState;
use crate::playback::{PlaybackSnapshot, PlayerCommand, VolumeLevel};
use crate::playlist::Track;
use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, Sse},
    Json,
};
use futures::stream::Stream;
use linkbio_common::sse::broadcast_sse_stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tracing::{debug, error};

/// Error half of every fallible handler
pub type ApiError = (StatusCode, Json<StatusResponse>);

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    fn ok() -> Json<Self> {
        Json(Self {
            status: "ok".to_string(),
        })
    }
}

fn api_error(code: StatusCode, message: impl Into<String>) -> ApiError {
    (
        code,
        Json(StatusResponse {
            status: format!("error: {}", message.into()),
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    git_hash: String,
    build_timestamp: String,
    build_profile: String,
    engine_running: bool,
}

#[derive(Debug, Serialize)]
pub struct PlaylistResponse {
    tracks: Vec<Track>,
    current_index: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    percent: f64,
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    volume: u8, // 0-100 user-facing scale
}

#[derive(Debug, Deserialize)]
pub struct MuteRequest {
    muted: bool,
}

#[derive(Debug, Serialize)]
pub struct VolumeResponse {
    volume: u8,
    muted: bool,
    effective: f32,
    level: VolumeLevel,
}

// ============================================================================
// Helpers
// ============================================================================

async fn send(state: &AppState, command: PlayerCommand) -> Result<Json<StatusResponse>, ApiError> {
    debug!("API command: {:?}", command);
    match state.engine.send(command).await {
        Ok(()) => Ok(StatusResponse::ok()),
        Err(e) => {
            error!("Command rejected: {}", e);
            Err(api_error(StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
        }
    }
}

async fn current_snapshot(state: &AppState) -> Result<PlaybackSnapshot, ApiError> {
    state
        .shared
        .snapshot()
        .await
        .ok_or_else(|| api_error(StatusCode::SERVICE_UNAVAILABLE, "engine not started"))
}

// ============================================================================
// Health and playlist
// ============================================================================

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "linkbio-ap".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
        engine_running: state.engine.is_running(),
    })
}

/// GET /playlist
pub async fn get_playlist(State(state): State<AppState>) -> Json<PlaylistResponse> {
    let current_index = state.shared.snapshot().await.map(|s| s.current_index);
    Json(PlaylistResponse {
        tracks: state.playlist.tracks().to_vec(),
        current_index,
    })
}

// ============================================================================
// Playback control
// ============================================================================

/// GET /playback/state
pub async fn get_playback_state(
    State(state): State<AppState>,
) -> Result<Json<PlaybackSnapshot>, ApiError> {
    current_snapshot(&state).await.map(Json)
}

/// POST /playback/play
pub async fn play(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    send(&state, PlayerCommand::Play).await
}

/// POST /playback/pause
pub async fn pause(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    send(&state, PlayerCommand::Pause).await
}

/// POST /playback/toggle
pub async fn toggle(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    send(&state, PlayerCommand::Toggle).await
}

/// POST /playback/next
pub async fn next(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    send(&state, PlayerCommand::Next).await
}

/// POST /playback/previous
pub async fn previous(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    send(&state, PlayerCommand::Previous).await
}

/// POST /playback/seek - `{"percent": 0-100}`, out-of-range values are clamped
pub async fn seek(
    State(state): State<AppState>,
    Json(req): Json<SeekRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    if !req.percent.is_finite() {
        return Err(api_error(StatusCode::BAD_REQUEST, "percent must be a finite number"));
    }
    send(&state, PlayerCommand::Seek(req.percent)).await
}

// ============================================================================
// Volume
// ============================================================================

/// GET /audio/volume
pub async fn get_volume(State(state): State<AppState>) -> Result<Json<VolumeResponse>, ApiError> {
    let snapshot = current_snapshot(&state).await?;
    Ok(Json(VolumeResponse {
        volume: snapshot.volume_percent,
        muted: snapshot.is_muted,
        effective: snapshot.effective_volume,
        level: snapshot.volume_level,
    }))
}

/// POST /audio/volume - slider semantics: 0 mutes, anything else unmutes
pub async fn set_volume(
    State(state): State<AppState>,
    Json(req): Json<VolumeRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    if req.volume > 100 {
        return Err(api_error(StatusCode::BAD_REQUEST, "volume must be 0-100"));
    }
    send(&state, PlayerCommand::SlideVolume(req.volume)).await
}

/// POST /audio/mute
pub async fn set_mute(
    State(state): State<AppState>,
    Json(req): Json<MuteRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    send(&state, PlayerCommand::SetMuted(req.muted)).await
}

// ============================================================================
// Events
// ============================================================================

/// GET /events - SSE stream of player events
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");
    broadcast_sse_stream(state.shared.subscribe_events())
}
