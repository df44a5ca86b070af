//! Shared fixtures for linkbio-ap integration tests
//!
//! - [`RecordingBackend`]: synchronous mock that logs every backend call;
//!   tests feed media events to the controller by hand
//! - playlist/controller builders

#![allow(dead_code)]

use linkbio_ap::media::{MediaBackend, MediaEvent, MediaEventKind, MediaHandle};
use linkbio_ap::playback::{PlaybackController, TransitionSettings, VolumeState};
use linkbio_ap::playlist::{Playlist, Track};
use linkbio_ap::{Error, Result};
use linkbio_common::config::TransitionMode;
use linkbio_common::events::{EventBus, PlayerEvent};
use linkbio_common::FadeCurve;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One call made on the backend
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open(MediaHandle, String),
    Play(MediaHandle),
    Pause(MediaHandle),
    Seek(MediaHandle, Duration),
    SetVolume(MediaHandle, f32),
    Close(MediaHandle),
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub calls: Vec<Call>,
    pub volumes: HashMap<MediaHandle, f32>,
    pub open: HashSet<MediaHandle>,
    pub playing: HashSet<MediaHandle>,
    pub reject_play: bool,
    pub fail_open: bool,
    next: u64,
}

/// Inspection handle that outlives the controller owning the backend
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Recorded>>);

impl Recorder {
    pub fn with<T>(&self, f: impl FnOnce(&mut Recorded) -> T) -> T {
        f(&mut self.0.lock().unwrap())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.with(|r| r.calls.clone())
    }

    pub fn volume(&self, handle: MediaHandle) -> Option<f32> {
        self.with(|r| r.volumes.get(&handle).copied())
    }

    pub fn is_open(&self, handle: MediaHandle) -> bool {
        self.with(|r| r.open.contains(&handle))
    }

    pub fn is_playing(&self, handle: MediaHandle) -> bool {
        self.with(|r| r.playing.contains(&handle))
    }

    pub fn open_count(&self) -> usize {
        self.with(|r| r.open.len())
    }

    pub fn opened(&self) -> Vec<MediaHandle> {
        self.with(|r| {
            r.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Open(h, _) => Some(*h),
                    _ => None,
                })
                .collect()
        })
    }

    pub fn set_reject_play(&self, reject: bool) {
        self.with(|r| r.reject_play = reject);
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.with(|r| r.fail_open = fail);
    }
}

pub struct RecordingBackend {
    recorder: Recorder,
}

impl RecordingBackend {
    pub fn new() -> (Self, Recorder) {
        let recorder = Recorder::default();
        (
            Self {
                recorder: recorder.clone(),
            },
            recorder,
        )
    }

    fn known(&self, handle: MediaHandle) -> Result<()> {
        if self.recorder.is_open(handle) {
            Ok(())
        } else {
            Err(Error::Media(format!("unknown handle {}", handle)))
        }
    }
}

impl MediaBackend for RecordingBackend {
    fn open(&mut self, url: &str) -> Result<MediaHandle> {
        self.recorder.with(|r| {
            if r.fail_open {
                return Err(Error::Media(format!("cannot open {}", url)));
            }
            r.next += 1;
            let handle = MediaHandle(r.next);
            r.open.insert(handle);
            r.volumes.insert(handle, 1.0);
            r.calls.push(Call::Open(handle, url.to_string()));
            Ok(handle)
        })
    }

    fn play(&mut self, handle: MediaHandle) -> Result<()> {
        self.known(handle)?;
        self.recorder.with(|r| {
            if r.reject_play {
                return Err(Error::PlaybackRejected("autoplay blocked".to_string()));
            }
            r.playing.insert(handle);
            r.calls.push(Call::Play(handle));
            Ok(())
        })
    }

    fn pause(&mut self, handle: MediaHandle) -> Result<()> {
        self.known(handle)?;
        self.recorder.with(|r| {
            r.playing.remove(&handle);
            r.calls.push(Call::Pause(handle));
        });
        Ok(())
    }

    fn seek(&mut self, handle: MediaHandle, position: Duration) -> Result<()> {
        self.known(handle)?;
        self.recorder.with(|r| r.calls.push(Call::Seek(handle, position)));
        Ok(())
    }

    fn set_volume(&mut self, handle: MediaHandle, volume: f32) -> Result<()> {
        self.known(handle)?;
        self.recorder.with(|r| {
            r.volumes.insert(handle, volume);
            r.calls.push(Call::SetVolume(handle, volume));
        });
        Ok(())
    }

    fn close(&mut self, handle: MediaHandle) -> Result<()> {
        self.known(handle)?;
        self.recorder.with(|r| {
            r.open.remove(&handle);
            r.playing.remove(&handle);
            r.calls.push(Call::Close(handle));
        });
        Ok(())
    }
}

pub fn playlist(n: usize) -> Playlist {
    Playlist::new(
        (0..n)
            .map(|i| {
                Track::new(
                    format!("https://cdn.example/track{}.mp3", i),
                    format!("Track {}", i),
                    "Test Artist",
                )
            })
            .collect(),
    )
    .unwrap()
}

pub fn crossfade_settings() -> TransitionSettings {
    TransitionSettings {
        mode: TransitionMode::Crossfade,
        crossfade: Duration::from_secs(1),
        steps_per_second: 120,
        curve: FadeCurve::Linear,
        settle_delay: Duration::from_millis(50),
    }
}

pub fn hard_cut_settings(settle_ms: u64) -> TransitionSettings {
    TransitionSettings {
        mode: TransitionMode::HardCut,
        settle_delay: Duration::from_millis(settle_ms),
        ..crossfade_settings()
    }
}

pub struct Fixture {
    pub controller: PlaybackController<RecordingBackend>,
    pub recorder: Recorder,
    pub events: Arc<EventBus>,
}

pub fn fixture(tracks: usize, settings: TransitionSettings) -> Fixture {
    let (backend, recorder) = RecordingBackend::new();
    let events = Arc::new(EventBus::new(256));
    let controller = PlaybackController::new(
        backend,
        playlist(tracks),
        settings,
        VolumeState::default(),
        Arc::clone(&events),
    )
    .unwrap();
    Fixture {
        controller,
        recorder,
        events,
    }
}

impl Fixture {
    pub fn active(&self) -> MediaHandle {
        self.controller.active_handle().unwrap()
    }

    /// Deliver metadata for the active output
    pub fn load_active(&mut self, secs: u64) {
        let handle = self.active();
        self.load(handle, secs);
    }

    pub fn load(&mut self, handle: MediaHandle, secs: u64) {
        self.controller.handle_media_event(MediaEvent::new(
            handle,
            MediaEventKind::MetadataLoaded {
                duration: Some(Duration::from_secs(secs)),
            },
        ));
    }

    /// Deliver metadata for the crossfade's incoming output, if any
    pub fn load_incoming(&mut self, secs: u64) {
        if let Some(handle) = self.controller.incoming_handle() {
            self.load(handle, secs);
        }
    }

    pub fn send(&mut self, handle: MediaHandle, kind: MediaEventKind) {
        self.controller.handle_media_event(MediaEvent::new(handle, kind));
    }

    /// Loaded and playing on the first track
    pub fn start_playing(&mut self) {
        self.load_active(180);
        self.controller.play();
        assert!(self.controller.is_playing());
    }
}

/// One frame at 120 steps per second, rounded up to the next nanosecond
///
/// Exactly 120 of these cover one second.
pub fn frame() -> Duration {
    Duration::from_nanos(8_333_334)
}

pub fn drain(rx: &mut tokio::sync::broadcast::Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}
