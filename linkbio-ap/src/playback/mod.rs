//! Playback control, crossfading and the engine task

pub mod controller;
pub mod crossfade;
pub mod engine;
pub mod scheduler;
pub mod state;
pub mod volume;

pub use controller::{PlaybackController, TransitionSettings};
pub use engine::{EngineHandle, PlaybackEngine, PlayerCommand};
pub use state::{PlaybackSnapshot, SlotState};
pub use volume::{VolumeLevel, VolumeState};
