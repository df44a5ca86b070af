//! # linkbio Common Library
//!
//! Shared code for the linkbio player crates:
//! - Event types (`PlayerEvent`) and the broadcast `EventBus`
//! - Configuration file loading
//! - Fade curve definitions
//! - Track clock formatting and SSE helpers

pub mod config;
pub mod error;
pub mod events;
pub mod fade_curves;
pub mod human_time;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
pub use fade_curves::FadeCurve;
