//! TOML configuration loading and config file resolution
//!
//! Configuration sources, highest priority first:
//! 1. Command-line argument (`--config`)
//! 2. Environment variable (`LINKBIO_CONFIG`)
//! 3. Per-user file (`~/.config/linkbio/config.toml`), then `/etc/linkbio/config.toml`
//! 4. Built-in defaults
//!
//! A missing config file is not an error: the player starts with defaults
//! and logs a warning.

use crate::fade_curves::FadeCurve;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "LINKBIO_CONFIG";

/// Complete player configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub transition: TransitionConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Playlist, in playback order
    #[serde(default)]
    pub tracks: Vec<TrackConfig>,
}

/// HTTP control surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Startup playback behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Start playing as soon as the player is up
    #[serde(default)]
    pub autoplay: bool,

    /// Initial volume, 0-100
    #[serde(default = "default_volume")]
    pub volume: u8,

    #[serde(default)]
    pub muted: bool,

    /// Interval between `PlaybackPosition` events while playing
    #[serde(default = "default_position_event_interval_ms")]
    pub position_event_interval_ms: u64,

    /// Track length reported by the simulated backend
    #[serde(default = "default_simulated_track_secs")]
    pub simulated_track_secs: u64,
}

/// How the player moves between tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransitionMode {
    /// Overlap the outgoing and incoming tracks with inverse volume ramps
    #[default]
    Crossfade,

    /// Stop the current track and start the next after a short settle delay
    HardCut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionConfig {
    #[serde(default)]
    pub mode: TransitionMode,

    #[serde(default = "default_crossfade_ms")]
    pub crossfade_ms: u64,

    /// Volume updates per second during a crossfade
    #[serde(default = "default_steps_per_second")]
    pub steps_per_second: u32,

    #[serde(default)]
    pub curve: FadeCurve,

    /// Delay before `play()` after a hard cut
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

/// Audio output device selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Output device name (None = system default)
    #[serde(default)]
    pub device: Option<String>,

    /// Output buffer size in frames (None = device default)
    #[serde(default)]
    pub buffer_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// One playlist entry as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackConfig {
    pub url: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub artist: Option<String>,
}

fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5741
}

fn default_volume() -> u8 {
    15
}

fn default_position_event_interval_ms() -> u64 {
    1000
}

fn default_simulated_track_secs() -> u64 {
    180
}

fn default_crossfade_ms() -> u64 {
    1000
}

fn default_steps_per_second() -> u32 {
    120
}

fn default_settle_delay_ms() -> u64 {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            autoplay: false,
            volume: default_volume(),
            muted: false,
            position_event_interval_ms: default_position_event_interval_ms(),
            simulated_track_secs: default_simulated_track_secs(),
        }
    }
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            mode: TransitionMode::default(),
            crossfade_ms: default_crossfade_ms(),
            steps_per_second: default_steps_per_second(),
            curve: FadeCurve::default(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TomlConfig {
    /// Parse and validate a config document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load the highest-priority config file, or defaults when none exists
    ///
    /// An explicitly named file (CLI or environment) that cannot be read is
    /// an error; a missing default-location file is not.
    pub fn load_or_default(cli_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_config_path(cli_path) {
            info!("Loading configuration from {}", path.display());
            return Self::load(&path);
        }

        match default_config_path() {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::load(&path)
            }
            None => {
                warn!("No configuration file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Range checks that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.playback.volume > 100 {
            return Err(Error::Config(format!(
                "playback.volume must be 0-100, got {}",
                self.playback.volume
            )));
        }
        if self.transition.steps_per_second == 0 {
            return Err(Error::Config(
                "transition.steps_per_second must be greater than 0".to_string(),
            ));
        }
        if self.playback.position_event_interval_ms == 0 {
            return Err(Error::Config(
                "playback.position_event_interval_ms must be greater than 0".to_string(),
            ));
        }
        if let Some(track) = self.tracks.iter().find(|t| t.url.trim().is_empty()) {
            return Err(Error::Config(format!(
                "track url must not be empty (title: {:?})",
                track.title
            )));
        }
        Ok(())
    }
}

/// Config path given on the command line or through `LINKBIO_CONFIG`
pub fn explicit_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    std::env::var(CONFIG_ENV_VAR)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// First existing file among the platform default locations
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("linkbio").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/linkbio/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}
