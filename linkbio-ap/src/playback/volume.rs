//! Master volume and mute

use serde::{Deserialize, Serialize};

/// Volume icon category shown next to the slider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeLevel {
    Muted,
    Low,
    Medium,
    High,
}

/// User-facing volume (0-100) plus the mute override
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeState {
    percent: u8,
    muted: bool,
}

impl VolumeState {
    /// `percent` is clamped to 100
    pub fn new(percent: u8, muted: bool) -> Self {
        Self {
            percent: percent.min(100),
            muted,
        }
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Gain actually applied to output: `muted ? 0 : percent / 100`
    pub fn effective(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.percent as f32 / 100.0
        }
    }

    pub fn set_percent(&mut self, percent: u8) {
        self.percent = percent.min(100);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Slider semantics: dragging to zero mutes, any other value unmutes
    pub fn slide_to(&mut self, percent: u8) {
        self.set_percent(percent);
        if self.percent == 0 {
            self.muted = true;
        } else if self.muted {
            self.muted = false;
        }
    }

    pub fn level(&self) -> VolumeLevel {
        match self.percent {
            _ if self.muted => VolumeLevel::Muted,
            0 => VolumeLevel::Muted,
            1..=29 => VolumeLevel::Low,
            30..=69 => VolumeLevel::Medium,
            _ => VolumeLevel::High,
        }
    }
}

impl Default for VolumeState {
    fn default() -> Self {
        Self::new(15, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_volume() {
        assert_eq!(VolumeState::new(50, false).effective(), 0.5);
        assert_eq!(VolumeState::new(50, true).effective(), 0.0);
        assert_eq!(VolumeState::new(100, false).effective(), 1.0);
    }

    #[test]
    fn test_percent_clamped() {
        let mut volume = VolumeState::new(250, false);
        assert_eq!(volume.percent(), 100);
        volume.set_percent(101);
        assert_eq!(volume.percent(), 100);
    }

    #[test]
    fn test_slider_zero_mutes_and_nonzero_unmutes() {
        let mut volume = VolumeState::new(40, false);
        volume.slide_to(0);
        assert!(volume.is_muted());
        assert_eq!(volume.effective(), 0.0);

        volume.slide_to(25);
        assert!(!volume.is_muted());
        assert_eq!(volume.effective(), 0.25);
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(VolumeState::new(0, false).level(), VolumeLevel::Muted);
        assert_eq!(VolumeState::new(80, true).level(), VolumeLevel::Muted);
        assert_eq!(VolumeState::new(29, false).level(), VolumeLevel::Low);
        assert_eq!(VolumeState::new(30, false).level(), VolumeLevel::Medium);
        assert_eq!(VolumeState::new(69, false).level(), VolumeLevel::Medium);
        assert_eq!(VolumeState::new(70, false).level(), VolumeLevel::High);
    }
}
