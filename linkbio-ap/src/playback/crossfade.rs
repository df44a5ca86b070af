//! Crossfade volume schedule between two media outputs
//!
//! A session owns the outgoing and incoming handles for the length of one
//! transition. Progress is counted in whole frames:
//! `progress = elapsed_frames / total_frames`, where
//! `elapsed_frames = floor(elapsed * steps_per_second)`.

use crate::media::MediaHandle;
use crate::playback::scheduler::TickOutcome;
use linkbio_common::FadeCurve;
use std::time::{Duration, Instant};

/// Gains to apply for one frame of a crossfade
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossfadeStep {
    pub outgoing_volume: f32,
    pub incoming_volume: f32,
    /// `[0.0, 1.0]`
    pub progress: f32,
    pub outcome: TickOutcome,
}

/// One in-flight transition
#[derive(Debug, Clone)]
pub struct CrossfadeSession {
    outgoing: MediaHandle,
    incoming: MediaHandle,
    target_index: usize,
    started_at: Instant,
    duration: Duration,
    steps_per_second: u32,
    total_frames: u32,
    elapsed: Duration,
    from_volume: f32,
    to_volume: f32,
    curve: FadeCurve,
}

impl CrossfadeSession {
    /// Outgoing ramps from `from_volume` to 0, incoming from 0 to `to_volume`
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        outgoing: MediaHandle,
        incoming: MediaHandle,
        target_index: usize,
        duration: Duration,
        steps_per_second: u32,
        from_volume: f32,
        to_volume: f32,
        curve: FadeCurve,
    ) -> Self {
        let steps_per_second = steps_per_second.max(1);
        let total_frames = (duration.as_secs_f64() * steps_per_second as f64).round() as u32;

        Self {
            outgoing,
            incoming,
            target_index,
            started_at: Instant::now(),
            duration,
            steps_per_second,
            total_frames: total_frames.max(1),
            elapsed: Duration::ZERO,
            from_volume,
            to_volume,
            curve,
        }
    }

    pub fn outgoing(&self) -> MediaHandle {
        self.outgoing
    }

    pub fn incoming(&self) -> MediaHandle {
        self.incoming
    }

    pub fn target_index(&self) -> usize {
        self.target_index
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    /// Whole frames elapsed so far, capped at `total_frames`
    pub fn elapsed_frames(&self) -> u32 {
        let frames = (self.elapsed.as_secs_f64() * self.steps_per_second as f64).floor();
        (frames as u32).min(self.total_frames)
    }

    pub fn progress(&self) -> f32 {
        self.elapsed_frames() as f32 / self.total_frames as f32
    }

    /// Gains at the current position without advancing
    pub fn current_step(&self) -> CrossfadeStep {
        let progress = self.progress();
        CrossfadeStep {
            outgoing_volume: self.from_volume * self.curve.fade_out(progress),
            incoming_volume: self.to_volume * self.curve.fade_in(progress),
            progress,
            outcome: if progress >= 1.0 {
                TickOutcome::Done
            } else {
                TickOutcome::Continue
            },
        }
    }

    /// Accumulate `elapsed` and return the gains for the new position
    pub fn advance(&mut self, elapsed: Duration) -> CrossfadeStep {
        self.elapsed = self.elapsed.saturating_add(elapsed);
        self.current_step()
    }
}
