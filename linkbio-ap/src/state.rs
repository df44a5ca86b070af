//! Shared playback state
//!
//! The engine task owns the controller. HTTP handlers only read the last
//! published snapshot and subscribe to the event bus.

use crate::playback::state::PlaybackSnapshot;
use linkbio_common::events::{EventBus, PlayerEvent};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Default event bus capacity
pub const EVENT_BUS_CAPACITY: usize = 256;

/// State visible outside the engine task
pub struct SharedState {
    /// Snapshot taken after the engine's last step (None before start)
    snapshot: RwLock<Option<PlaybackSnapshot>>,

    /// Event broadcaster for SSE
    events: Arc<EventBus>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::with_bus(Arc::new(EventBus::new(EVENT_BUS_CAPACITY)))
    }

    pub fn with_bus(events: Arc<EventBus>) -> Self {
        Self {
            snapshot: RwLock::new(None),
            events,
        }
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Subscribe to event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> Option<PlaybackSnapshot> {
        self.snapshot.read().await.clone()
    }

    pub async fn publish(&self, snapshot: PlaybackSnapshot) {
        *self.snapshot.write().await = Some(snapshot);
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
