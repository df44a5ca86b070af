//! Media backend abstraction
//!
//! The playback controller never touches an audio API directly. It drives a
//! [`MediaBackend`] through handles and reacts to [`MediaEvent`]s that the
//! backend delivers later on the engine's event channel. Backends:
//!
//! - [`device::DeviceBackend`]: decodes with symphonia, plays through cpal
//! - [`simulated::SimulatedBackend`]: virtual outputs on a timer, no audio

pub mod device;
pub mod simulated;

use crate::error::Result;
use std::time::Duration;

pub use device::DeviceBackend;
pub use simulated::SimulatedBackend;

/// Opaque identifier of one media output owned by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaHandle(pub u64);

impl std::fmt::Display for MediaHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "media#{}", self.0)
    }
}

/// Host audio facility driven by the playback controller
///
/// All methods return immediately. Loading, buffering and reaching the end
/// of a track are reported asynchronously as [`MediaEvent`]s.
pub trait MediaBackend {
    /// Bind a new output to `url` and start loading it; output starts paused
    fn open(&mut self, url: &str) -> Result<MediaHandle>;

    /// Start or resume output. A backend that refuses (autoplay policy,
    /// missing device) returns `Error::PlaybackRejected`.
    fn play(&mut self, handle: MediaHandle) -> Result<()>;

    fn pause(&mut self, handle: MediaHandle) -> Result<()>;

    /// Move the play position
    fn seek(&mut self, handle: MediaHandle, position: Duration) -> Result<()>;

    /// Output gain in `[0.0, 1.0]`
    fn set_volume(&mut self, handle: MediaHandle, volume: f32) -> Result<()>;

    /// Stop output and release the handle
    fn close(&mut self, handle: MediaHandle) -> Result<()>;
}

/// Asynchronous notification from a backend about one output
#[derive(Debug, Clone, PartialEq)]
pub struct MediaEvent {
    pub handle: MediaHandle,
    pub kind: MediaEventKind,
}

impl MediaEvent {
    pub fn new(handle: MediaHandle, kind: MediaEventKind) -> Self {
        Self { handle, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEventKind {
    /// Metadata is available; `None` for streams without a finite length
    MetadataLoaded { duration: Option<Duration> },

    /// Play position advanced
    TimeUpdate { position: Duration },

    /// Play position reached the end of the resource
    Ended,

    /// A deferred play request was refused
    PlayRejected { reason: String },

    /// Loading or decoding failed; the output will never become ready
    Error { message: String },
}
