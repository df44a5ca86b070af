//! Per-track slot state machine and the observable playback snapshot

use crate::error::{Error, Result};
use crate::playback::volume::VolumeLevel;
use crate::playlist::Track;
use linkbio_common::events::PlaybackState;
use serde::{Deserialize, Serialize};

/// Lifecycle of one media output bound to one track
///
/// ```text
/// Idle ──bind──▶ Loading ──metadata──▶ Ready ──play──▶ Playing ──end──▶ Ended
///                   ▲                                  │  ▲  ▲            │
///                   │                                pause play └──replay─┤
///                   │                                  ▼  │               │
///                   │                                 Paused ◀──seek──────┤
///                   └──────────────── bind (next track) ──────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotState {
    Idle,
    /// Bound to a resource, duration unknown
    Loading,
    /// Duration known, seekable
    Ready,
    Playing,
    Paused,
    /// Reached the end; always followed by an advance
    Ended,
}

/// Inputs of the slot state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotTrigger {
    Bind,
    MetadataLoaded,
    Play,
    Pause,
    Seek,
    ReachEnd,
}

impl SlotTrigger {
    fn name(self) -> &'static str {
        match self {
            SlotTrigger::Bind => "bind",
            SlotTrigger::MetadataLoaded => "metadata",
            SlotTrigger::Play => "play",
            SlotTrigger::Pause => "pause",
            SlotTrigger::Seek => "seek",
            SlotTrigger::ReachEnd => "end",
        }
    }
}

impl SlotState {
    /// Next state for `trigger`, or `Error::InvalidTransition`
    pub fn transition(self, trigger: SlotTrigger) -> Result<SlotState> {
        use SlotState::*;
        use SlotTrigger::*;

        let next = match (self, trigger) {
            (Idle | Ended, Bind) => Loading,
            (Loading, MetadataLoaded) => Ready,
            (Ready | Paused | Ended, Play) => Playing,
            (Playing, Pause) => Paused,
            (Ready | Paused | Playing, Seek) => self,
            (Ended, Seek) => Paused,
            (Playing, ReachEnd) => Ended,
            (from, trigger) => {
                return Err(Error::InvalidTransition {
                    from,
                    trigger: trigger.name(),
                })
            }
        };
        Ok(next)
    }

    /// Duration is known, so seeking is meaningful
    pub fn is_seekable(self) -> bool {
        matches!(
            self,
            SlotState::Ready | SlotState::Playing | SlotState::Paused | SlotState::Ended
        )
    }
}

/// Everything the display layer needs, captured at one instant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub current_index: usize,
    pub track: Track,
    pub playlist_len: usize,
    pub is_playing: bool,
    pub progress_percent: f64,
    pub position_secs: f64,
    pub duration_secs: Option<f64>,
    /// `M:SS` of `position_secs`
    pub elapsed: String,
    /// `M:SS` of `duration_secs`, `0:00` while unknown
    pub total: String,
    pub volume_percent: u8,
    pub is_muted: bool,
    pub effective_volume: f32,
    pub volume_level: VolumeLevel,
    pub session_state: PlaybackState,
    pub slot_state: SlotState,
    pub crossfading: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = SlotState::Idle
            .transition(SlotTrigger::Bind)
            .and_then(|s| s.transition(SlotTrigger::MetadataLoaded))
            .and_then(|s| s.transition(SlotTrigger::Play))
            .and_then(|s| s.transition(SlotTrigger::Pause))
            .and_then(|s| s.transition(SlotTrigger::Play))
            .and_then(|s| s.transition(SlotTrigger::ReachEnd))
            .and_then(|s| s.transition(SlotTrigger::Bind))
            .unwrap();
        assert_eq!(state, SlotState::Loading);
    }

    #[test]
    fn test_cannot_play_while_loading() {
        let err = SlotState::Loading.transition(SlotTrigger::Play).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition { from: SlotState::Loading, trigger: "play" }
        ));
    }

    #[test]
    fn test_only_playing_reaches_end() {
        assert!(SlotState::Paused.transition(SlotTrigger::ReachEnd).is_err());
        assert!(SlotState::Ready.transition(SlotTrigger::ReachEnd).is_err());
        assert_eq!(
            SlotState::Playing.transition(SlotTrigger::ReachEnd).unwrap(),
            SlotState::Ended
        );
    }

    #[test]
    fn test_seek_keeps_state_except_ended() {
        assert_eq!(SlotState::Playing.transition(SlotTrigger::Seek).unwrap(), SlotState::Playing);
        assert_eq!(SlotState::Ready.transition(SlotTrigger::Seek).unwrap(), SlotState::Ready);
        assert_eq!(SlotState::Ended.transition(SlotTrigger::Seek).unwrap(), SlotState::Paused);
        assert!(SlotState::Loading.transition(SlotTrigger::Seek).is_err());
    }

    #[test]
    fn test_ended_output_can_replay() {
        assert_eq!(SlotState::Ended.transition(SlotTrigger::Play).unwrap(), SlotState::Playing);
        assert!(SlotState::Idle.transition(SlotTrigger::Play).is_err());
    }

    #[test]
    fn test_seekable() {
        assert!(!SlotState::Idle.is_seekable());
        assert!(!SlotState::Loading.is_seekable());
        assert!(SlotState::Ready.is_seekable());
    }
}
