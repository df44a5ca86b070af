//! Event types and the broadcast bus for the linkbio player
//!
//! Events are emitted by the playback engine and fanned out to any number
//! of subscribers (SSE clients, tests, loggers) through [`EventBus`].

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Player event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Playing flag changed
    PlaybackStateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A different playlist entry became the active track
    TrackChanged {
        index: usize,
        title: String,
        artist: String,
        url: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Duration of the active track became known
    TrackLoaded {
        index: usize,
        duration_ms: Option<u64>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Periodic position update while playing
    PlaybackPosition {
        index: usize,
        position_ms: u64,
        duration_ms: Option<u64>,
        progress_percent: f64,
        playing: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Volume or mute changed
    VolumeChanged {
        volume_percent: u8,
        muted: bool,
        effective: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Crossfade between two playlist entries started
    CrossfadeStarted {
        from_index: usize,
        to_index: usize,
        duration_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Crossfade finished; `index` is now the active track
    CrossfadeCompleted {
        index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The host refused to start playback (autoplay policy, device error)
    PlaybackRejected {
        index: usize,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayerEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            PlayerEvent::TrackChanged { .. } => "TrackChanged",
            PlayerEvent::TrackLoaded { .. } => "TrackLoaded",
            PlayerEvent::PlaybackPosition { .. } => "PlaybackPosition",
            PlayerEvent::VolumeChanged { .. } => "VolumeChanged",
            PlayerEvent::CrossfadeStarted { .. } => "CrossfadeStarted",
            PlayerEvent::CrossfadeCompleted { .. } => "CrossfadeCompleted",
            PlayerEvent::PlaybackRejected { .. } => "PlaybackRejected",
        }
    }
}

/// Media-session style playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Nothing has been played yet
    None,
    Paused,
    Playing,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::None => write!(f, "none"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Playing => write!(f, "playing"),
        }
    }
}

/// One-to-many event distribution backed by `tokio::sync::broadcast`
///
/// Slow subscribers lose the oldest events once `capacity` is exceeded.
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use linkbio_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.capacity(), 256);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
