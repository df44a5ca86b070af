//! Virtual media outputs driven by a timer
//!
//! Used when no audio device is wanted (headless hosts, CI) and by the
//! engine tests. Each output advances its position in real time while
//! playing and reports `TimeUpdate` / `Ended` like a device would.

use super::{MediaBackend, MediaEvent, MediaEventKind, MediaHandle};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

/// Position report cadence, matching a browser's `timeupdate`
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
struct VirtualVoice {
    url: String,
    duration: Option<Duration>,
    position: Duration,
    playing: bool,
    volume: f32,
}

type Voices = Arc<Mutex<HashMap<MediaHandle, VirtualVoice>>>;

/// Timer-backed [`MediaBackend`]
pub struct SimulatedBackend {
    voices: Voices,
    events: UnboundedSender<MediaEvent>,
    track_duration: Option<Duration>,
    reject_play: bool,
    next_handle: u64,
    ticker: JoinHandle<()>,
}

impl SimulatedBackend {
    /// Every opened output reports `track_duration`; `None` simulates a
    /// live stream without a finite length
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(events: UnboundedSender<MediaEvent>, track_duration: Option<Duration>) -> Result<Self> {
        Self::with_tick_period(events, track_duration, DEFAULT_TICK_PERIOD)
    }

    pub fn with_tick_period(
        events: UnboundedSender<MediaEvent>,
        track_duration: Option<Duration>,
        tick_period: Duration,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Media(format!("simulated backend needs a tokio runtime: {}", e)))?;

        let voices: Voices = Arc::new(Mutex::new(HashMap::new()));
        let ticker = runtime.spawn(run_ticker(Arc::clone(&voices), events.clone(), tick_period));

        debug!(
            "Simulated media backend started (track duration {:?}, tick {:?})",
            track_duration, tick_period
        );

        Ok(Self {
            voices,
            events,
            track_duration,
            reject_play: false,
            next_handle: 1,
            ticker,
        })
    }

    /// Refuse every `play` the way a browser blocks autoplay
    pub fn set_reject_play(&mut self, reject: bool) {
        self.reject_play = reject;
    }

    /// Gain last applied to `handle`
    pub fn volume_of(&self, handle: MediaHandle) -> Option<f32> {
        self.voices.lock().ok()?.get(&handle).map(|v| v.volume)
    }

    pub fn is_playing(&self, handle: MediaHandle) -> bool {
        self.voices
            .lock()
            .ok()
            .and_then(|voices| voices.get(&handle).map(|v| v.playing))
            .unwrap_or(false)
    }

    /// Number of outputs currently open
    pub fn open_count(&self) -> usize {
        self.voices.lock().map(|v| v.len()).unwrap_or(0)
    }

    fn with_voice<T>(
        &self,
        handle: MediaHandle,
        f: impl FnOnce(&mut VirtualVoice) -> T,
    ) -> Result<T> {
        let mut voices = self
            .voices
            .lock()
            .map_err(|_| Error::Media("voice table poisoned".to_string()))?;
        let voice = voices
            .get_mut(&handle)
            .ok_or_else(|| Error::Media(format!("unknown handle {}", handle)))?;
        Ok(f(voice))
    }
}

impl MediaBackend for SimulatedBackend {
    fn open(&mut self, url: &str) -> Result<MediaHandle> {
        let handle = MediaHandle(self.next_handle);
        self.next_handle += 1;

        let voice = VirtualVoice {
            url: url.to_string(),
            duration: self.track_duration,
            position: Duration::ZERO,
            playing: false,
            volume: 1.0,
        };
        self.voices
            .lock()
            .map_err(|_| Error::Media("voice table poisoned".to_string()))?
            .insert(handle, voice);

        debug!("Opened {} for {}", handle, url);

        // Metadata is "loaded" immediately but still arrives through the
        // event channel, after the caller has finished its current step
        let _ = self.events.send(MediaEvent::new(
            handle,
            MediaEventKind::MetadataLoaded {
                duration: self.track_duration,
            },
        ));
        Ok(handle)
    }

    fn play(&mut self, handle: MediaHandle) -> Result<()> {
        if self.reject_play {
            return Err(Error::PlaybackRejected(
                "autoplay blocked by simulated host".to_string(),
            ));
        }
        self.with_voice(handle, |v| {
            // Replaying an ended output starts over
            if v.duration.is_some_and(|d| v.position >= d) {
                v.position = Duration::ZERO;
            }
            v.playing = true;
        })
    }

    fn pause(&mut self, handle: MediaHandle) -> Result<()> {
        self.with_voice(handle, |v| v.playing = false)
    }

    fn seek(&mut self, handle: MediaHandle, position: Duration) -> Result<()> {
        self.with_voice(handle, |v| {
            v.position = match v.duration {
                Some(d) => position.min(d),
                None => position,
            };
        })
    }

    fn set_volume(&mut self, handle: MediaHandle, volume: f32) -> Result<()> {
        self.with_voice(handle, |v| v.volume = volume.clamp(0.0, 1.0))
    }

    fn close(&mut self, handle: MediaHandle) -> Result<()> {
        let removed = self
            .voices
            .lock()
            .map_err(|_| Error::Media("voice table poisoned".to_string()))?
            .remove(&handle);

        match removed {
            Some(voice) => {
                debug!("Closed {} ({})", handle, voice.url);
                Ok(())
            }
            None => Err(Error::Media(format!("unknown handle {}", handle))),
        }
    }
}

impl Drop for SimulatedBackend {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}

async fn run_ticker(voices: Voices, events: UnboundedSender<MediaEvent>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;
        if events.is_closed() {
            break;
        }

        let mut pending = Vec::new();
        {
            let Ok(mut voices) = voices.lock() else {
                break;
            };
            for (handle, voice) in voices.iter_mut().filter(|(_, v)| v.playing) {
                voice.position += period;
                match voice.duration {
                    Some(d) if voice.position >= d => {
                        voice.position = d;
                        voice.playing = false;
                        pending.push(MediaEvent::new(*handle, MediaEventKind::TimeUpdate { position: d }));
                        pending.push(MediaEvent::new(*handle, MediaEventKind::Ended));
                    }
                    _ => pending.push(MediaEvent::new(
                        *handle,
                        MediaEventKind::TimeUpdate {
                            position: voice.position,
                        },
                    )),
                }
            }
        }

        for event in pending {
            trace!("Simulated {:?}", event);
            if events.send(event).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_open_reports_metadata() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut backend = SimulatedBackend::new(tx, Some(Duration::from_secs(3))).unwrap();

        let handle = backend.open("song.mp3").unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            MediaEvent::new(
                handle,
                MediaEventKind::MetadataLoaded {
                    duration: Some(Duration::from_secs(3))
                }
            )
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_playing_voice_reaches_end() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut backend = SimulatedBackend::new(tx, Some(Duration::from_millis(500))).unwrap();

        let handle = backend.open("song.mp3").unwrap();
        backend.play(handle).unwrap();

        let mut kinds = Vec::new();
        while let Some(event) = rx.recv().await {
            let ended = event.kind == MediaEventKind::Ended;
            kinds.push(event.kind);
            if ended {
                break;
            }
        }

        assert!(matches!(kinds[0], MediaEventKind::MetadataLoaded { .. }));
        assert_eq!(
            kinds[1],
            MediaEventKind::TimeUpdate {
                position: Duration::from_millis(250)
            }
        );
        assert_eq!(kinds.last(), Some(&MediaEventKind::Ended));
        assert!(!backend.is_playing(handle));
    }

    #[tokio::test]
    async fn test_rejects_play_when_configured() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut backend = SimulatedBackend::new(tx, None).unwrap();
        backend.set_reject_play(true);

        let handle = backend.open("stream").unwrap();
        assert!(matches!(backend.play(handle), Err(Error::PlaybackRejected(_))));
    }

    #[tokio::test]
    async fn test_unknown_handle() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut backend = SimulatedBackend::new(tx, None).unwrap();

        assert!(backend.play(MediaHandle(42)).is_err());
        assert!(backend.close(MediaHandle(42)).is_err());
    }

    #[tokio::test]
    async fn test_volume_is_clamped() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut backend = SimulatedBackend::new(tx, None).unwrap();

        let handle = backend.open("a.mp3").unwrap();
        backend.set_volume(handle, 1.7).unwrap();
        assert_eq!(backend.volume_of(handle), Some(1.0));

        backend.close(handle).unwrap();
        assert_eq!(backend.open_count(), 0);
    }
}
