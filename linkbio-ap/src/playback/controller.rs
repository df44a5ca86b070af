//! Playback controller
//!
//! Owns the playlist cursor, the active media output and at most one
//! crossfade. All inputs (user commands, media events, frame ticks) arrive
//! on one task and are applied one at a time; nothing here blocks.
//!
//! Failure policy: user-facing operations never return errors. Backend
//! failures are logged and degrade to "no change in audio output".

use crate::error::Error;
use crate::media::{MediaBackend, MediaEvent, MediaEventKind, MediaHandle};
use crate::playback::crossfade::CrossfadeSession;
use crate::playback::scheduler::{FrameTask, TickOutcome};
use crate::playback::state::{PlaybackSnapshot, SlotState, SlotTrigger};
use crate::playback::volume::VolumeState;
use crate::playlist::{Playlist, Track};
use linkbio_common::config::{TransitionConfig, TransitionMode};
use linkbio_common::events::{EventBus, PlaybackState, PlayerEvent};
use linkbio_common::human_time::{format_duration, format_track_time};
use linkbio_common::time::{duration_to_millis, now};
use linkbio_common::FadeCurve;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How track changes are performed
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionSettings {
    pub mode: TransitionMode,
    pub crossfade: Duration,
    pub steps_per_second: u32,
    pub curve: FadeCurve,
    pub settle_delay: Duration,
}

impl Default for TransitionSettings {
    fn default() -> Self {
        Self::from(&TransitionConfig::default())
    }
}

impl From<&TransitionConfig> for TransitionSettings {
    fn from(config: &TransitionConfig) -> Self {
        Self {
            mode: config.mode,
            crossfade: Duration::from_millis(config.crossfade_ms),
            steps_per_second: config.steps_per_second.max(1),
            curve: config.curve,
            settle_delay: Duration::from_millis(config.settle_delay_ms),
        }
    }
}

/// One media output bound to one playlist entry
#[derive(Debug, Clone)]
struct Slot {
    handle: MediaHandle,
    index: usize,
    state: SlotState,
    duration: Option<Duration>,
    position: Duration,
}

impl Slot {
    fn bound(handle: MediaHandle, index: usize) -> Self {
        let mut slot = Self {
            handle,
            index,
            state: SlotState::Idle,
            duration: None,
            position: Duration::ZERO,
        };
        slot.apply(SlotTrigger::Bind);
        slot
    }

    /// Record that the backend output was started
    ///
    /// A loading slot moves to `Playing` once its metadata arrives. An ended
    /// output restarts from the top.
    fn mark_playing(&mut self) {
        if !matches!(self.state, SlotState::Ready | SlotState::Paused | SlotState::Ended) {
            return;
        }
        if self.state == SlotState::Ended {
            self.position = Duration::ZERO;
        }
        self.apply(SlotTrigger::Play);
    }

    /// Duration if known and non-zero
    fn known_duration(&self) -> Option<Duration> {
        self.duration.filter(|d| !d.is_zero())
    }

    fn progress_percent(&self) -> Option<f64> {
        self.known_duration().map(|d| {
            (self.position.as_secs_f64() / d.as_secs_f64() * 100.0).clamp(0.0, 100.0)
        })
    }

    fn apply(&mut self, trigger: SlotTrigger) {
        match self.state.transition(trigger) {
            Ok(next) => self.state = next,
            Err(e) => debug!("{} ({}): {}", self.handle, self.index, e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotRole {
    Active,
    Incoming,
}

/// Longest a crossfade holds its ramp waiting for the incoming output to load
const INCOMING_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Hard-cut play request waiting for the settle delay
#[derive(Debug, Clone, Copy)]
struct PendingStart {
    handle: MediaHandle,
    remaining: Duration,
}

/// Playlist traversal, play/pause, progress and crossfade transitions
pub struct PlaybackController<B: MediaBackend> {
    backend: B,
    playlist: Playlist,
    settings: TransitionSettings,
    events: Arc<EventBus>,
    current_index: usize,
    active: Option<Slot>,
    incoming: Option<Slot>,
    crossfade: Option<CrossfadeSession>,
    /// Time the current crossfade has spent waiting for incoming metadata
    incoming_wait: Duration,
    pending_start: Option<PendingStart>,
    is_playing: bool,
    has_played: bool,
    progress_percent: f64,
    volume: VolumeState,
    disposed: bool,
}

impl<B: MediaBackend> PlaybackController<B> {
    /// Create a controller bound to the first playlist entry
    ///
    /// Fails only when the backend cannot open the first track.
    pub fn new(
        mut backend: B,
        playlist: Playlist,
        settings: TransitionSettings,
        volume: VolumeState,
        events: Arc<EventBus>,
    ) -> crate::Result<Self> {
        let first = &playlist.tracks()[0];
        let handle = backend.open(&first.url)?;
        if let Err(e) = backend.set_volume(handle, volume.effective()) {
            warn!("Failed to set initial volume on {}: {}", handle, e);
        }

        info!(
            "Playback controller created: {} tracks, transition {:?}, first track '{}'",
            playlist.len(),
            settings.mode,
            first.title
        );

        let controller = Self {
            backend,
            playlist,
            settings,
            events,
            current_index: 0,
            active: Some(Slot::bound(handle, 0)),
            incoming: None,
            crossfade: None,
            incoming_wait: Duration::ZERO,
            pending_start: None,
            is_playing: false,
            has_played: false,
            progress_percent: 0.0,
            volume,
            disposed: false,
        };
        controller.emit_track_changed();
        Ok(controller)
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_track(&self) -> &Track {
        &self.playlist.tracks()[self.current_index]
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn progress_percent(&self) -> f64 {
        self.progress_percent
    }

    pub fn volume_percent(&self) -> u8 {
        self.volume.percent()
    }

    pub fn is_muted(&self) -> bool {
        self.volume.is_muted()
    }

    pub fn effective_volume(&self) -> f32 {
        self.volume.effective()
    }

    pub fn is_crossfading(&self) -> bool {
        self.crossfade.is_some()
    }

    /// Time-driven work (crossfade or settle delay) is outstanding
    pub fn needs_frames(&self) -> bool {
        self.crossfade.is_some() || self.pending_start.is_some()
    }

    pub fn active_handle(&self) -> Option<MediaHandle> {
        self.active.as_ref().map(|s| s.handle)
    }

    /// Output being faded in, while a crossfade runs
    pub fn incoming_handle(&self) -> Option<MediaHandle> {
        self.incoming.as_ref().map(|s| s.handle)
    }

    pub fn slot_state(&self) -> SlotState {
        self.active.as_ref().map_or(SlotState::Idle, |s| s.state)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Media-session view of the playing flag
    pub fn session_state(&self) -> PlaybackState {
        if self.is_playing {
            PlaybackState::Playing
        } else if self.has_played {
            PlaybackState::Paused
        } else {
            PlaybackState::None
        }
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let (position, duration) = self
            .active
            .as_ref()
            .map_or((Duration::ZERO, None), |s| (s.position, s.duration));

        PlaybackSnapshot {
            current_index: self.current_index,
            track: self.current_track().clone(),
            playlist_len: self.playlist.len(),
            is_playing: self.is_playing,
            progress_percent: self.progress_percent,
            position_secs: position.as_secs_f64(),
            duration_secs: duration.map(|d| d.as_secs_f64()),
            elapsed: format_track_time(position.as_secs_f64()),
            total: format_duration(duration),
            volume_percent: self.volume.percent(),
            is_muted: self.volume.is_muted(),
            effective_volume: self.volume.effective(),
            volume_level: self.volume.level(),
            session_state: self.session_state(),
            slot_state: self.slot_state(),
            crossfading: self.crossfade.is_some(),
        }
    }

    /// Broadcast the active track's position
    pub fn emit_position(&self) {
        let Some(slot) = self.active.as_ref() else {
            return;
        };
        self.emit(PlayerEvent::PlaybackPosition {
            index: self.current_index,
            position_ms: duration_to_millis(slot.position),
            duration_ms: slot.duration.map(duration_to_millis),
            progress_percent: self.progress_percent,
            playing: self.is_playing,
            timestamp: now(),
        });
    }

    // ------------------------------------------------------------------
    // User operations
    // ------------------------------------------------------------------

    /// Start or resume output; no-op when already playing
    pub fn play(&mut self) {
        if self.disposed || self.is_playing {
            debug!("play ignored (playing={}, disposed={})", self.is_playing, self.disposed);
            return;
        }
        let Some(handle) = self.active_handle() else {
            return;
        };

        match self.backend.play(handle) {
            Ok(()) => {
                let old = self.session_state();
                self.is_playing = true;
                self.has_played = true;
                if let Some(slot) = self.active.as_mut() {
                    slot.mark_playing();
                    if let Some(progress) = slot.progress_percent() {
                        self.progress_percent = progress;
                    }
                }
                info!("Playing track {} '{}'", self.current_index, self.current_track().title);
                self.emit_state_change(old);
            }
            Err(e) => self.reject(reason_of(e)),
        }
    }

    /// Suspend output; no-op when already paused
    ///
    /// A running crossfade is completed first so the paused output is the
    /// incoming track.
    pub fn pause(&mut self) {
        if self.disposed || !self.is_playing {
            debug!("pause ignored (playing={}, disposed={})", self.is_playing, self.disposed);
            return;
        }

        if self.crossfade.is_some() {
            self.complete_crossfade();
        }
        self.pending_start = None;

        let old = self.session_state();
        self.is_playing = false;
        if let Some(slot) = self.active.as_mut() {
            if let Err(e) = self.backend.pause(slot.handle) {
                warn!("Failed to pause {}: {}", slot.handle, e);
            }
            if slot.state == SlotState::Playing {
                slot.apply(SlotTrigger::Pause);
            }
        }
        info!("Paused track {}", self.current_index);
        self.emit_state_change(old);
    }

    /// Play when paused, pause when playing
    pub fn toggle(&mut self) {
        if self.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Jump to `percent` of the active track
    ///
    /// `percent` is clamped to `[0, 100]`. Ignored while the duration is
    /// unknown or zero.
    pub fn seek(&mut self, percent: f64) {
        if self.disposed || percent.is_nan() {
            return;
        }
        let percent = percent.clamp(0.0, 100.0);

        let Some(slot) = self.active.as_mut() else {
            return;
        };
        let Some(duration) = slot.known_duration().filter(|_| slot.state.is_seekable()) else {
            debug!("Seek to {:.1}% ignored: duration unknown", percent);
            return;
        };

        let position = duration.mul_f64(percent / 100.0);
        match self.backend.seek(slot.handle, position) {
            Ok(()) => {
                slot.position = position;
                if slot.state == SlotState::Ended && self.is_playing {
                    // Seeking back into a finished output that should be audible
                    if let Err(e) = self.backend.play(slot.handle) {
                        warn!("Failed to restart {} after seek: {}", slot.handle, e);
                    }
                    slot.apply(SlotTrigger::Play);
                } else {
                    slot.apply(SlotTrigger::Seek);
                }
                self.progress_percent = percent;
                debug!("Seeked track {} to {:.1}%", self.current_index, percent);
            }
            Err(e) => warn!("Seek on {} failed: {}", slot.handle, e),
        }
    }

    /// Set the volume percent (clamped to 100)
    pub fn set_volume(&mut self, percent: u8) {
        self.volume.set_percent(percent);
        self.volume_changed();
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.volume.set_muted(muted);
        self.volume_changed();
    }

    /// Volume slider: zero mutes, a non-zero value unmutes
    pub fn slide_volume(&mut self, percent: u8) {
        self.volume.slide_to(percent);
        self.volume_changed();
    }

    /// Advance to `(i + 1) mod N`; ignored while a crossfade is running
    pub fn next(&mut self) {
        let target = self.playlist.next_index(self.current_index);
        self.begin_transition(target, "next");
    }

    /// Go back to `(i - 1 + N) mod N`; ignored while a crossfade is running
    pub fn previous(&mut self) {
        let target = self.playlist.previous_index(self.current_index);
        self.begin_transition(target, "previous");
    }

    /// Release every backend output and drop pending time-driven work
    ///
    /// Idempotent. Called automatically on drop.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.crossfade = None;
        self.pending_start = None;
        self.is_playing = false;

        for slot in [self.incoming.take(), self.active.take()].into_iter().flatten() {
            if let Err(e) = self.backend.close(slot.handle) {
                warn!("Failed to close {} on dispose: {}", slot.handle, e);
            }
        }
        info!("Playback controller disposed");
    }

    // ------------------------------------------------------------------
    // Media events
    // ------------------------------------------------------------------

    /// Apply one backend notification
    ///
    /// Events for outputs this controller no longer owns are dropped.
    pub fn handle_media_event(&mut self, event: MediaEvent) {
        if self.disposed {
            return;
        }
        let MediaEvent { handle, kind } = event;
        let Some(role) = self.role_of(handle) else {
            debug!("Dropping {:?} for stale {}", kind, handle);
            return;
        };

        match kind {
            MediaEventKind::MetadataLoaded { duration } => self.on_metadata(role, duration),
            MediaEventKind::TimeUpdate { position } => self.on_time_update(role, position),
            MediaEventKind::Ended => self.on_ended(role),
            MediaEventKind::PlayRejected { reason } => {
                if role == SlotRole::Active && self.crossfade.is_some() {
                    // The incoming output is healthy; finish onto it
                    warn!("Outgoing track refused playback mid-crossfade: {}", reason);
                    self.complete_crossfade();
                    return;
                }
                if role == SlotRole::Incoming {
                    self.complete_crossfade();
                }
                if let Some(slot) = self.active.as_mut() {
                    if slot.state == SlotState::Playing {
                        slot.apply(SlotTrigger::Pause);
                    }
                }
                self.reject(reason);
            }
            MediaEventKind::Error { message } => self.on_media_error(role, message),
        }
    }

    fn role_of(&self, handle: MediaHandle) -> Option<SlotRole> {
        if self.active.as_ref().is_some_and(|s| s.handle == handle) {
            Some(SlotRole::Active)
        } else if self.incoming.as_ref().is_some_and(|s| s.handle == handle) {
            Some(SlotRole::Incoming)
        } else {
            None
        }
    }

    fn slot_mut(&mut self, role: SlotRole) -> Option<&mut Slot> {
        match role {
            SlotRole::Active => self.active.as_mut(),
            SlotRole::Incoming => self.incoming.as_mut(),
        }
    }

    /// Whether output for `role` is supposed to be audible right now
    fn should_play(&self, role: SlotRole) -> bool {
        match role {
            SlotRole::Active => self.is_playing && self.pending_start.is_none(),
            SlotRole::Incoming => true,
        }
    }

    fn on_metadata(&mut self, role: SlotRole, duration: Option<Duration>) {
        let should_play = self.should_play(role);
        let Some(slot) = self.slot_mut(role) else {
            return;
        };

        slot.duration = duration;
        slot.apply(SlotTrigger::MetadataLoaded);
        if should_play && slot.state == SlotState::Ready {
            slot.apply(SlotTrigger::Play);
        }
        let index = slot.index;
        debug!("Track {} loaded, duration {:?}", index, duration);

        if role == SlotRole::Active {
            self.emit(PlayerEvent::TrackLoaded {
                index,
                duration_ms: duration.map(duration_to_millis),
                timestamp: now(),
            });
        }
    }

    fn on_time_update(&mut self, role: SlotRole, position: Duration) {
        let Some(slot) = self.slot_mut(role) else {
            return;
        };
        slot.position = position;
        let progress = slot.progress_percent();

        if role == SlotRole::Active {
            if let Some(progress) = progress {
                self.progress_percent = progress;
            }
        }
    }

    fn on_ended(&mut self, role: SlotRole) {
        let Some(slot) = self.slot_mut(role) else {
            return;
        };
        if slot.state == SlotState::Playing {
            slot.apply(SlotTrigger::ReachEnd);
        } else {
            debug!("{} ended from {:?}", slot.handle, slot.state);
            slot.state = SlotState::Ended;
        }
        if let Some(d) = slot.duration {
            slot.position = d;
        }

        match role {
            // Outgoing finished mid-fade: the session completes on its own
            SlotRole::Active if self.crossfade.is_some() => {}
            SlotRole::Active => self.advance_after_end(),
            // Picked up when the session promotes the incoming slot
            SlotRole::Incoming => debug!("Incoming track ended during crossfade"),
        }
    }

    fn on_media_error(&mut self, role: SlotRole, message: String) {
        match role {
            SlotRole::Incoming => {
                error!("Incoming track failed to load, cancelling crossfade: {}", message);
                self.abort_crossfade();
            }
            SlotRole::Active if self.crossfade.is_some() => {
                error!("Outgoing track {} failed mid-crossfade: {}", self.current_index, message);
                self.complete_crossfade();
            }
            SlotRole::Active => {
                error!("Track {} failed: {}", self.current_index, message);
                self.pending_start = None;
                self.reject(message);
            }
        }
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Returns false when no transition took place
    fn begin_transition(&mut self, target: usize, reason: &str) -> bool {
        if self.disposed {
            return false;
        }
        if self.crossfade.is_some() {
            debug!("Crossfade in progress, ignoring {}", reason);
            return false;
        }

        match self.settings.mode {
            TransitionMode::Crossfade if self.is_playing => self.start_crossfade(target, reason),
            _ => self.hard_cut(target, reason),
        }
    }

    fn start_crossfade(&mut self, target: usize, reason: &str) -> bool {
        let Some(outgoing) = self.active_handle() else {
            return false;
        };
        let url = self.playlist.tracks()[target].url.clone();

        let incoming = match self.backend.open(&url) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Cannot open track {} for crossfade: {}", target, e);
                return false;
            }
        };
        if let Err(e) = self.backend.set_volume(incoming, 0.0) {
            warn!("Failed to zero volume on {}: {}", incoming, e);
        }
        if let Err(e) = self.backend.play(incoming) {
            warn!("Incoming track {} refused to play ({}), falling back to hard cut", target, e);
            if let Err(e) = self.backend.close(incoming) {
                warn!("Failed to close {}: {}", incoming, e);
            }
            return self.hard_cut(target, reason);
        }

        let effective = self.volume.effective();
        let session = CrossfadeSession::new(
            outgoing,
            incoming,
            target,
            self.settings.crossfade,
            self.settings.steps_per_second,
            effective,
            effective,
            self.settings.curve,
        );

        info!(
            "Crossfade ({}) {} -> {} over {:?}",
            reason, self.current_index, target, self.settings.crossfade
        );
        self.emit(PlayerEvent::CrossfadeStarted {
            from_index: self.current_index,
            to_index: target,
            duration_ms: duration_to_millis(self.settings.crossfade),
            timestamp: now(),
        });

        self.incoming = Some(Slot::bound(incoming, target));
        self.crossfade = Some(session);
        self.incoming_wait = Duration::ZERO;
        true
    }

    /// Promote the incoming output and retire the outgoing one
    fn complete_crossfade(&mut self) {
        let Some(session) = self.crossfade.take() else {
            return;
        };
        let Some(incoming) = self.incoming.take() else {
            return;
        };

        if let Some(outgoing) = self.active.replace(incoming) {
            if let Err(e) = self.backend.close(outgoing.handle) {
                warn!("Failed to close outgoing {}: {}", outgoing.handle, e);
            }
        }

        self.current_index = session.target_index();
        self.progress_percent = self
            .active
            .as_ref()
            .and_then(Slot::progress_percent)
            .unwrap_or(0.0);
        self.apply_volume();

        info!(
            "Crossfade complete, now playing track {} ({:?} ramp, {:?} since start)",
            self.current_index,
            session.duration(),
            session.started_at().elapsed()
        );
        self.emit(PlayerEvent::CrossfadeCompleted {
            index: self.current_index,
            timestamp: now(),
        });
        self.emit_track_changed();

        if self.slot_state() == SlotState::Ended {
            self.advance_after_end();
        }
    }

    /// Drop the incoming output and restore the outgoing volume
    fn abort_crossfade(&mut self) {
        self.crossfade = None;
        if let Some(incoming) = self.incoming.take() {
            if let Err(e) = self.backend.close(incoming.handle) {
                warn!("Failed to close {}: {}", incoming.handle, e);
            }
        }
        self.apply_volume();

        if self.slot_state() == SlotState::Ended {
            let old = self.session_state();
            self.is_playing = false;
            self.emit_state_change(old);
        }
    }

    fn hard_cut(&mut self, target: usize, reason: &str) -> bool {
        let url = self.playlist.tracks()[target].url.clone();
        let handle = match self.backend.open(&url) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Cannot open track {}: {}", target, e);
                return false;
            }
        };

        if let Some(old) = self.active.take() {
            if old.state == SlotState::Playing {
                if let Err(e) = self.backend.pause(old.handle) {
                    warn!("Failed to pause {}: {}", old.handle, e);
                }
            }
            if let Err(e) = self.backend.close(old.handle) {
                warn!("Failed to close {}: {}", old.handle, e);
            }
        }

        self.current_index = target;
        self.active = Some(Slot::bound(handle, target));
        self.progress_percent = 0.0;
        self.pending_start = None;
        self.apply_volume();

        info!("Switched ({}) to track {} '{}'", reason, target, self.current_track().title);
        self.emit_track_changed();

        if self.is_playing {
            if self.settings.settle_delay.is_zero() {
                self.start_pending(handle);
            } else {
                self.pending_start = Some(PendingStart {
                    handle,
                    remaining: self.settings.settle_delay,
                });
            }
        }
        true
    }

    fn start_pending(&mut self, handle: MediaHandle) {
        if self.active_handle() != Some(handle) {
            return;
        }
        match self.backend.play(handle) {
            Ok(()) => {
                if let Some(slot) = self.active.as_mut() {
                    slot.mark_playing();
                }
            }
            Err(e) => self.reject(reason_of(e)),
        }
    }

    fn advance_after_end(&mut self) {
        let target = self.playlist.next_index(self.current_index);
        info!("Track {} ended, advancing to {}", self.current_index, target);
        if !self.begin_transition(target, "track ended") {
            let old = self.session_state();
            self.is_playing = false;
            self.emit_state_change(old);
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn reject(&mut self, reason: String) {
        warn!("Playback of track {} rejected: {}", self.current_index, reason);
        let old = self.session_state();
        self.is_playing = false;
        self.pending_start = None;
        self.emit(PlayerEvent::PlaybackRejected {
            index: self.current_index,
            reason,
            timestamp: now(),
        });
        self.emit_state_change(old);
    }

    fn volume_changed(&mut self) {
        self.apply_volume();
        debug!(
            "Volume {}% muted={} effective={:.2}",
            self.volume.percent(),
            self.volume.is_muted(),
            self.volume.effective()
        );
        self.emit(PlayerEvent::VolumeChanged {
            volume_percent: self.volume.percent(),
            muted: self.volume.is_muted(),
            effective: self.volume.effective(),
            timestamp: now(),
        });
    }

    /// Push the effective volume to the active output unless a crossfade
    /// owns the gains
    fn apply_volume(&mut self) {
        if self.crossfade.is_some() {
            return;
        }
        if let Some(handle) = self.active_handle() {
            if let Err(e) = self.backend.set_volume(handle, self.volume.effective()) {
                warn!("Failed to set volume on {}: {}", handle, e);
            }
        }
    }

    fn emit(&self, event: PlayerEvent) {
        self.events.emit_lossy(event);
    }

    fn emit_state_change(&self, old_state: PlaybackState) {
        let new_state = self.session_state();
        if old_state != new_state {
            self.emit(PlayerEvent::PlaybackStateChanged {
                old_state,
                new_state,
                timestamp: now(),
            });
        }
    }

    fn emit_track_changed(&self) {
        let track = self.current_track();
        self.emit(PlayerEvent::TrackChanged {
            index: self.current_index,
            title: track.title.clone(),
            artist: track.artist.clone(),
            url: track.url.clone(),
            timestamp: now(),
        });
    }
}

impl<B: MediaBackend> FrameTask for PlaybackController<B> {
    /// Advance the crossfade ramp and the hard-cut settle delay
    fn tick(&mut self, elapsed: Duration) -> TickOutcome {
        if self.disposed {
            return TickOutcome::Done;
        }

        let incoming_loading = self
            .incoming
            .as_ref()
            .is_some_and(|s| s.state == SlotState::Loading);
        let holding = self.crossfade.is_some()
            && incoming_loading
            && self.incoming_wait < INCOMING_LOAD_TIMEOUT;

        if holding {
            // Ramp starts once the incoming output has audio to fade in
            self.incoming_wait = self.incoming_wait.saturating_add(elapsed);
            if self.incoming_wait >= INCOMING_LOAD_TIMEOUT {
                warn!("Incoming track still loading after {:?}, fading anyway", INCOMING_LOAD_TIMEOUT);
            }
        } else if let Some(session) = self.crossfade.as_mut() {
            let step = session.advance(elapsed);
            let (outgoing, incoming) = (session.outgoing(), session.incoming());

            if let Err(e) = self.backend.set_volume(outgoing, step.outgoing_volume) {
                warn!("Failed to ramp {}: {}", outgoing, e);
            }
            if let Err(e) = self.backend.set_volume(incoming, step.incoming_volume) {
                warn!("Failed to ramp {}: {}", incoming, e);
            }

            if step.outcome.is_done() {
                self.complete_crossfade();
            }
        }

        if let Some(pending) = self.pending_start.as_mut() {
            pending.remaining = pending.remaining.saturating_sub(elapsed);
            if pending.remaining.is_zero() {
                let handle = pending.handle;
                self.pending_start = None;
                self.start_pending(handle);
            }
        }

        if self.needs_frames() {
            TickOutcome::Continue
        } else {
            TickOutcome::Done
        }
    }
}

impl<B: MediaBackend> Drop for PlaybackController<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn reason_of(err: Error) -> String {
    match err {
        Error::PlaybackRejected(reason) => reason,
        other => other.to_string(),
    }
}
