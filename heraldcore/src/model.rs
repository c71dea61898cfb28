//! Plain data exchanged between the streaming service, the decision logic
//! and the poll loop.

pub const UNKNOWN_ALBUM: &str = "Unknown album";
pub const UNKNOWN_SONG: &str = "Unknown song";

/// Kind of item currently loaded on the player.
///
/// Only [`ItemKind::Track`] is ever announced; ads and podcast episodes are
/// skipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemKind {
    Track,
    Episode,
    Ad,
    Unknown(String),
}

impl ItemKind {
    /// Maps the service's wire type tag (`"track"`, `"episode"`, `"ad"`).
    pub fn from_wire(value: &str) -> Self {
        match value {
            "track" => ItemKind::Track,
            "episode" => ItemKind::Episode,
            "ad" => ItemKind::Ad,
            other => ItemKind::Unknown(other.to_string()),
        }
    }

    pub fn is_track(&self) -> bool {
        matches!(self, ItemKind::Track)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    /// Artist names in the order the service lists them.
    pub artist_names: Vec<String>,
    pub album_name: String,
    pub title: String,
    pub duration_ms: u64,
    pub kind: ItemKind,
}

impl Track {
    /// Builds a track, substituting the sentinels for missing album or title.
    pub fn new(
        artist_names: Vec<String>,
        album_name: Option<String>,
        title: Option<String>,
        duration_ms: u64,
        kind: ItemKind,
    ) -> Self {
        Self {
            artist_names,
            album_name: album_name
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
            title: title
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| UNKNOWN_SONG.to_string()),
            duration_ms,
            kind,
        }
    }
}

/// One point-in-time read of the player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    /// Device volume in percent, 0 to 100.
    pub device_volume: u8,
    pub track: Option<Track>,
    pub progress_ms: u64,
    pub duration_ms: u64,
}

impl PlaybackSnapshot {
    /// Milliseconds left in the current item, never negative.
    pub fn remaining_ms(&self) -> u64 {
        self.duration_ms.saturating_sub(self.progress_ms)
    }
}

/// Options chosen when the announcer is started. They do not change while
/// the loop runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnnouncementConfig {
    pub include_song_titles: bool,
    pub include_album_titles: bool,
    /// Announce as soon as a new artist shows up instead of in the last
    /// seconds of the previous track.
    pub announce_at_track_start: bool,
}

/// Language and accent handed to the speech synthesizer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Voice {
    pub language: String,
    /// Top-level domain selecting the regional accent (e.g. `co.uk`).
    pub tld: String,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            tld: "co.uk".to_string(),
        }
    }
}

/// State owned by the poll loop for the duration of one session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Artist key of the last announcement that actually played.
    pub previous_artist_key: Option<String>,
    pub running: bool,
}
