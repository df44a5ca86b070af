//! Fixed, ordered playlist
//!
//! The playlist is built once at startup and never mutated. Index
//! arithmetic wraps in both directions.

use crate::error::{Error, Result};
use linkbio_common::config::TrackConfig;
use serde::Serialize;

/// Artist shown when the config does not name one
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Title shown when neither the config nor the URL yields one
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// One playable entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Track {
    /// Audio resource locator: local path or http(s) URL
    pub url: String,
    pub title: String,
    pub artist: String,
}

impl Track {
    pub fn new(url: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            artist: artist.into(),
        }
    }

    /// Build a track from a bare URL, deriving the title from its file name
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let title = title_from_url(&url);
        Self {
            url,
            title,
            artist: UNKNOWN_ARTIST.to_string(),
        }
    }
}

impl From<&TrackConfig> for Track {
    fn from(config: &TrackConfig) -> Self {
        let title = config
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| title_from_url(&config.url));
        let artist = config
            .artist
            .clone()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

        Self {
            url: config.url.clone(),
            title,
            artist,
        }
    }
}

/// Last path segment of `url` without query string or fragment
///
/// `"/audio/my-song.mp3?v=3"` becomes `"my-song.mp3"`.
pub fn title_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or("");
    without_query
        .rsplit(['/', '\\'])
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
}

/// Non-empty, immutable list of tracks
#[derive(Debug, Clone)]
pub struct Playlist {
    tracks: Vec<Track>,
}

impl Playlist {
    pub fn new(tracks: Vec<Track>) -> Result<Self> {
        if tracks.is_empty() {
            return Err(Error::EmptyPlaylist);
        }
        Ok(Self { tracks })
    }

    pub fn from_config(entries: &[TrackConfig]) -> Result<Self> {
        Self::new(entries.iter().map(Track::from).collect())
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// `(index + 1) mod N`
    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.tracks.len()
    }

    /// `(index - 1 + N) mod N`
    pub fn previous_index(&self, index: usize) -> usize {
        let n = self.tracks.len();
        (index % n + n - 1) % n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist(n: usize) -> Playlist {
        Playlist::new(
            (0..n)
                .map(|i| Track::from_url(format!("/audio/track{}.mp3", i)))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_playlist_rejected() {
        assert!(matches!(Playlist::new(Vec::new()), Err(Error::EmptyPlaylist)));
    }

    #[test]
    fn test_next_cycles_back_to_start() {
        for n in 1..=7 {
            let playlist = playlist(n);
            for start in 0..n {
                let mut index = start;
                for _ in 0..n {
                    index = playlist.next_index(index);
                }
                assert_eq!(index, start, "n={} start={}", n, start);
            }
        }
    }

    #[test]
    fn test_previous_then_next_is_identity() {
        let playlist = playlist(4);
        for index in 0..4 {
            assert_eq!(playlist.next_index(playlist.previous_index(index)), index);
            assert_eq!(playlist.previous_index(playlist.next_index(index)), index);
        }
    }

    #[test]
    fn test_previous_wraps_from_zero() {
        assert_eq!(playlist(3).previous_index(0), 2);
        assert_eq!(playlist(1).previous_index(0), 0);
    }

    #[test]
    fn test_title_from_url() {
        assert_eq!(title_from_url("/audio/my-audio-file.mp3"), "my-audio-file.mp3");
        assert_eq!(title_from_url("https://cdn.example.com/a/b.mp3?sig=1#t=3"), "b.mp3");
        assert_eq!(title_from_url("song.ogg"), "song.ogg");
        assert_eq!(title_from_url("https://example.com/"), UNKNOWN_TITLE);
        assert_eq!(title_from_url(""), UNKNOWN_TITLE);
    }

    #[test]
    fn test_track_from_config_fallbacks() {
        let config = TrackConfig {
            url: "/audio/night-drive.mp3".to_string(),
            title: None,
            artist: Some("  ".to_string()),
        };
        let track = Track::from(&config);
        assert_eq!(track.title, "night-drive.mp3");
        assert_eq!(track.artist, UNKNOWN_ARTIST);

        let named = TrackConfig {
            url: "/audio/x.mp3".to_string(),
            title: Some("Night Drive".to_string()),
            artist: Some("Synth Person".to_string()),
        };
        assert_eq!(Track::from(&named), Track::new("/audio/x.mp3", "Night Drive", "Synth Person"));
    }
}
