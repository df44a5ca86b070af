//! Integration tests for config file resolution
//!
//! Tests that manipulate LINKBIO_CONFIG are marked with #[serial] so they
//! do not race each other on the process environment.

use linkbio_common::config::{explicit_config_path, TomlConfig, TransitionMode, CONFIG_ENV_VAR};
use linkbio_common::FadeCurve;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

const SAMPLE_CONFIG: &str = r#"
[playback]
volume = 40
autoplay = true

[transition]
mode = "crossfade"
crossfade_ms = 1500
curve = "equal_power"

[[tracks]]
url = "/audio/first.mp3"
title = "First"
artist = "Someone"

[[tracks]]
url = "/audio/second.mp3?v=2"
"#;

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, SAMPLE_CONFIG).unwrap();

    let config = TomlConfig::load(&path).unwrap();

    assert_eq!(config.playback.volume, 40);
    assert!(config.playback.autoplay);
    assert_eq!(config.transition.mode, TransitionMode::Crossfade);
    assert_eq!(config.transition.crossfade_ms, 1500);
    assert_eq!(config.transition.curve, FadeCurve::EqualPower);
    assert_eq!(config.tracks.len(), 2);
    assert_eq!(config.tracks[1].url, "/audio/second.mp3?v=2");
}

#[test]
fn test_load_missing_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");

    let err = TomlConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
#[serial]
fn test_cli_path_beats_environment() {
    let temp_dir = TempDir::new().unwrap();
    let cli = temp_dir.path().join("cli.toml");
    let from_env = temp_dir.path().join("env.toml");

    env::set_var(CONFIG_ENV_VAR, &from_env);
    let resolved = explicit_config_path(Some(&cli));
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(cli));
}

#[test]
#[serial]
fn test_environment_path_used_without_cli() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("env.toml");
    fs::write(&path, "[playback]\nvolume = 77\n").unwrap();

    env::set_var(CONFIG_ENV_VAR, &path);
    let config = TomlConfig::load_or_default(None);
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.unwrap().playback.volume, 77);
}

#[test]
#[serial]
fn test_explicit_missing_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing.toml");

    env::remove_var(CONFIG_ENV_VAR);
    assert!(TomlConfig::load_or_default(Some(&path)).is_err());
}

#[test]
#[serial]
fn test_empty_environment_value_ignored() {
    env::set_var(CONFIG_ENV_VAR, "");
    let resolved = explicit_config_path(None);
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, None);
}
