//! Error types for linkbio-ap
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use crate::playback::state::SlotState;
use thiserror::Error;

/// Main error type for linkbio-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Playlist has no tracks
    #[error("Playlist is empty")]
    EmptyPlaylist,

    /// Media backend errors (unknown handle, closed output)
    #[error("Media error: {0}")]
    Media(String),

    /// Host refused to start playback (autoplay policy, device unavailable)
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),

    /// Audio fetching or decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Track slot state machine violation
    #[error("Invalid transition from {from:?} on {trigger}")]
    InvalidTransition { from: SlotState, trigger: &'static str },

    /// Playback engine is no longer running
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from linkbio-common
    #[error(transparent)]
    Common(#[from] linkbio_common::Error),
}

/// Convenience Result type using linkbio-ap Error
pub type Result<T> = std::result::Result<T, Error>;
