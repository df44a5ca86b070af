//! # linkbio Audio Player Library (linkbio-ap)
//!
//! Music player behind a link-in-bio page: a fixed playlist, play/pause,
//! seek, volume and mute, and crossfaded (or hard-cut) track changes.
//!
//! **Architecture:** one engine task owns the [`playback::PlaybackController`],
//! which drives a [`media::MediaBackend`] (symphonia + rubato + cpal, or a
//! simulated backend). Control and state are exposed over HTTP/SSE.

pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod media;
pub mod playback;
pub mod playlist;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
