//! Structures de l'API Web Spotify et conversion vers le modèle de
//! l'announcer

use heraldcore::{ItemKind, PlaybackSnapshot, Track};
use serde::Deserialize;

/// Réponse de `GET /me/player`
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackState {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub device: Option<Device>,
    /// `null` pendant une publicité
    #[serde(default)]
    pub item: Option<PlayableItem>,
    /// `track`, `episode`, `ad` ou `unknown`
    #[serde(default)]
    pub currently_playing_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    /// `null` pour les appareils sans contrôle de volume
    #[serde(default)]
    pub volume_percent: Option<u8>,
}

/// Piste ou épisode de podcast
#[derive(Debug, Clone, Deserialize)]
pub struct PlayableItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: Option<AlbumRef>,
    #[serde(default)]
    pub show: Option<ShowRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumRef {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShowRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
}

impl PlayableItem {
    fn to_track(&self) -> Track {
        let kind = ItemKind::from_wire(&self.kind);

        let mut artist_names: Vec<String> = self.artists.iter().map(|a| a.name.clone()).collect();
        if artist_names.is_empty() {
            // Épisode : l'éditeur du podcast tient lieu d'artiste
            if let Some(show) = &self.show {
                if let Some(name) = show.publisher.clone().or_else(|| show.name.clone()) {
                    artist_names.push(name);
                }
            }
        }

        let album_name = match (&self.album, &self.show) {
            (Some(album), _) => album.name.clone(),
            (None, Some(show)) => show.name.clone(),
            (None, None) => None,
        };

        Track::new(
            artist_names,
            album_name,
            self.name.clone(),
            self.duration_ms,
            kind,
        )
    }
}

impl PlaybackState {
    /// Volume de l'appareil actif, 0 s'il est inconnu
    pub fn device_volume(&self) -> u8 {
        self.device
            .as_ref()
            .and_then(|d| d.volume_percent)
            .unwrap_or(0)
            .min(100)
    }

    /// Convertit l'état du player en snapshot pour l'announcer
    ///
    /// Une publicité arrive sans `item` : elle est représentée par une piste
    /// vide de type [`ItemKind::Ad`] pour être ignorée plutôt que prise pour
    /// une absence de lecture.
    pub fn to_snapshot(&self) -> PlaybackSnapshot {
        let track = match &self.item {
            Some(item) => Some(item.to_track()),
            None => match self.currently_playing_type.as_deref() {
                Some("track") | None => None,
                Some(other) => Some(Track::new(
                    Vec::new(),
                    None,
                    None,
                    0,
                    ItemKind::from_wire(other),
                )),
            },
        };

        let duration_ms = track.as_ref().map(|t| t.duration_ms).unwrap_or(0);

        PlaybackSnapshot {
            is_playing: self.is_playing,
            device_volume: self.device_volume(),
            track,
            progress_ms: self.progress_ms.unwrap_or(0),
            duration_ms,
        }
    }
}
