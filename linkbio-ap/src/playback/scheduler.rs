//! Frame scheduling for time-driven effects
//!
//! Effects that play out over wall-clock time (crossfade ramps, the hard-cut
//! settle delay) are modeled as tasks ticked by the engine's frame timer.
//! Each tick receives the time elapsed since the previous one and reports
//! whether the task still needs frames.

use std::time::{Duration, Instant};

/// Result of one frame of a time-driven task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// More frames are needed
    Continue,
    /// Nothing left to do until new work is started
    Done,
}

impl TickOutcome {
    pub fn is_done(self) -> bool {
        self == TickOutcome::Done
    }
}

/// Something the frame timer can drive
pub trait FrameTask {
    fn tick(&mut self, elapsed: Duration) -> TickOutcome;
}

/// Measures the time between consecutive frames
#[derive(Debug, Clone)]
pub struct FrameClock {
    period: Duration,
    last: Option<Instant>,
}

impl FrameClock {
    /// Clock for `steps_per_second` frames per second (minimum 1)
    pub fn new(steps_per_second: u32) -> Self {
        Self {
            period: frame_period(steps_per_second),
            last: None,
        }
    }

    /// Timer period between frames
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start measuring from `now`; call when time-driven work begins
    pub fn restart(&mut self, now: Instant) {
        self.last = Some(now);
    }

    /// Time since the previous frame (or since `restart`)
    ///
    /// The first call without a preceding `restart` yields one period.
    pub fn elapsed(&mut self, now: Instant) -> Duration {
        let elapsed = match self.last {
            Some(last) => now.saturating_duration_since(last),
            None => self.period,
        };
        self.last = Some(now);
        elapsed
    }

    pub fn stop(&mut self) {
        self.last = None;
    }
}

/// `1s / steps_per_second`
pub fn frame_period(steps_per_second: u32) -> Duration {
    Duration::from_secs(1) / steps_per_second.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_period() {
        assert_eq!(frame_period(100), Duration::from_millis(10));
        assert_eq!(frame_period(0), Duration::from_secs(1));
        assert_eq!(FrameClock::new(120).period(), Duration::from_nanos(8_333_333));
    }

    #[test]
    fn test_elapsed_between_frames() {
        let start = Instant::now();
        let mut clock = FrameClock::new(120);
        clock.restart(start);

        assert_eq!(clock.elapsed(start + Duration::from_millis(8)), Duration::from_millis(8));
        assert_eq!(clock.elapsed(start + Duration::from_millis(20)), Duration::from_millis(12));
    }

    #[test]
    fn test_first_frame_without_restart_is_one_period() {
        let mut clock = FrameClock::new(50);
        assert_eq!(clock.elapsed(Instant::now()), Duration::from_millis(20));
    }

    #[test]
    fn test_tick_outcome() {
        assert!(TickOutcome::Done.is_done());
        assert!(!TickOutcome::Continue.is_done());
    }
}
