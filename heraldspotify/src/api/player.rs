//! Endpoints du player

use tracing::debug;

use super::SpotifyApi;
use crate::error::Result;
use crate::models::PlaybackState;

impl SpotifyApi {
    /// État courant du player, `None` si aucun appareil n'est actif
    pub fn current_playback(&self) -> Result<Option<PlaybackState>> {
        let state: Option<PlaybackState> =
            self.get("/me/player", &[("additional_types", "track,episode")])?;
        if state.is_none() {
            debug!("No active Spotify device");
        }
        Ok(state)
    }

    /// Règle le volume de l'appareil actif (0 à 100)
    pub fn set_volume(&self, percent: u8) -> Result<()> {
        let percent = percent.min(100).to_string();
        self.put("/me/player/volume", &[("volume_percent", percent.as_str())])
    }
}
