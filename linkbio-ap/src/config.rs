//! linkbio-ap configuration
//!
//! Merges the TOML file (see `linkbio_common::config`) with command-line
//! overrides into the [`Settings`] the binary runs with. Command-line
//! values win over the file.

use crate::error::{Error, Result};
use crate::playback::{TransitionSettings, VolumeState};
use crate::playlist::Playlist;
use clap::{Parser, ValueEnum};
use linkbio_common::config::{AudioConfig, TomlConfig, TrackConfig};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for linkbio-ap
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "linkbio-ap")]
#[command(about = "Music player for a link-in-bio page")]
#[command(version)]
pub struct Args {
    /// Config file (also read from LINKBIO_CONFIG)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "LINKBIO_PORT")]
    pub port: Option<u16>,

    /// Media backend
    #[arg(long, value_enum, default_value_t = BackendKind::Device)]
    pub backend: BackendKind,

    /// Track URL or path; repeat to build the playlist (replaces the file's)
    #[arg(long = "track", value_name = "URL")]
    pub tracks: Vec<String>,

    /// Start playing immediately
    #[arg(long)]
    pub autoplay: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BackendKind {
    /// Decode and play through the audio device
    #[default]
    Device,
    /// Timer-driven virtual outputs, no sound
    Simulated,
}

/// Effective runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub port: u16,
    pub backend: BackendKind,
    pub autoplay: bool,
    pub volume: VolumeState,
    pub position_interval: Duration,
    pub simulated_track: Duration,
    pub transition: TransitionSettings,
    pub audio: AudioConfig,
    pub log_level: String,
    pub tracks: Vec<TrackConfig>,
}

impl Settings {
    /// Load the config file the usual way, then apply `args`
    pub fn load(args: &Args) -> Result<Self> {
        let config = TomlConfig::load_or_default(args.config.as_deref())?;
        Ok(Self::from_parts(config, args))
    }

    pub fn from_parts(config: TomlConfig, args: &Args) -> Self {
        let tracks = if args.tracks.is_empty() {
            config.tracks
        } else {
            args.tracks
                .iter()
                .map(|url| TrackConfig {
                    url: url.clone(),
                    title: None,
                    artist: None,
                })
                .collect()
        };

        Self {
            bind_addr: config.server.bind_addr,
            port: args.port.unwrap_or(config.server.port),
            backend: args.backend,
            autoplay: args.autoplay || config.playback.autoplay,
            volume: VolumeState::new(config.playback.volume, config.playback.muted),
            position_interval: Duration::from_millis(config.playback.position_event_interval_ms),
            simulated_track: Duration::from_secs(config.playback.simulated_track_secs),
            transition: TransitionSettings::from(&config.transition),
            audio: config.audio,
            log_level: config.logging.level,
            tracks,
        }
    }

    pub fn playlist(&self) -> Result<Playlist> {
        Playlist::from_config(&self.tracks)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .bind_addr
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind address '{}': {}", self.bind_addr, e)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
