//! Session Spotify : tokens à jour et lecture du player
//!
//! Une [`SpotifySession`] est ouverte explicitement à partir de la
//! configuration, rafraîchit son token d'accès quand il approche de
//! l'expiration et réécrit le cache de tokens à chaque renouvellement.

use heraldconfig::Config;
use heraldcore::{PlaybackSnapshot, PlaybackSource, ServiceError};
use tracing::{debug, info, warn};

use crate::api::SpotifyApi;
use crate::api::auth::{AuthInfo, ClientCredentials, unix_now};
use crate::config_ext::SpotifyConfigExt;
use crate::error::{Result, SpotifyError};
use crate::models::PlaybackState;

pub struct SpotifySession {
    api: SpotifyApi,
    config: Config,
    credentials: ClientCredentials,
    auth: AuthInfo,
}

impl std::fmt::Debug for SpotifySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifySession")
            .field("api", &self.api)
            .field("client_id", &self.credentials.client_id)
            .field("expires_at", &self.auth.expires_at)
            .finish()
    }
}

impl SpotifySession {
    /// Ouvre une session avec les identifiants et les tokens de `config`
    ///
    /// # Errors
    ///
    /// * `SpotifyError::Config` - client id ou secret absents
    /// * `SpotifyError::NotAuthorized` - aucun token en cache
    /// * toute erreur du rafraîchissement si le token a expiré
    pub fn open(config: &Config) -> Result<Self> {
        Self::open_with_api(config, SpotifyApi::new())
    }

    /// Comme [`SpotifySession::open`], avec un client API déjà construit
    pub fn open_with_api(config: &Config, mut api: SpotifyApi) -> Result<Self> {
        let credentials = config.get_spotify_credentials()?;
        let auth = config
            .get_spotify_auth_info()?
            .ok_or(SpotifyError::NotAuthorized)?;

        api.set_access_token(auth.access_token.clone());

        let mut session = Self {
            api,
            config: config.clone(),
            credentials,
            auth,
        };
        session.ensure_fresh_token()?;

        info!(client_id = %session.credentials.client_id, "Spotify session opened");
        Ok(session)
    }

    /// Ferme la session
    pub fn close(mut self) {
        self.api.clear_access_token();
        info!("Spotify session closed");
    }

    pub fn auth_info(&self) -> &AuthInfo {
        &self.auth
    }

    fn ensure_fresh_token(&mut self) -> Result<()> {
        if !self.auth.needs_refresh(unix_now()) {
            return Ok(());
        }

        let refresh_token = self
            .auth
            .refresh_token
            .clone()
            .ok_or(SpotifyError::NotAuthorized)?;

        debug!(expires_at = self.auth.expires_at, "Access token expired");
        let auth = self.api.refresh(&self.credentials, &refresh_token)?;
        self.config.set_spotify_auth_info(&auth)?;
        self.auth = auth;
        Ok(())
    }

    /// Exécute `call` avec un token valide
    ///
    /// Un 401 malgré un token réputé valide (révocation côté Spotify) force
    /// un rafraîchissement puis un unique nouvel essai.
    fn with_token<T>(&mut self, call: impl Fn(&SpotifyApi) -> Result<T>) -> Result<T> {
        self.ensure_fresh_token()?;

        match call(&self.api) {
            Err(SpotifyError::Unauthorized(message)) if self.auth.refresh_token.is_some() => {
                warn!("Access token rejected ({}), refreshing", message);
                self.auth.expires_at = 0;
                self.ensure_fresh_token()?;
                call(&self.api)
            }
            other => other,
        }
    }

    /// État brut du player
    pub fn playback(&mut self) -> Result<Option<PlaybackState>> {
        self.with_token(|api| api.current_playback())
    }

    pub fn set_volume(&mut self, percent: u8) -> Result<()> {
        self.with_token(|api| api.set_volume(percent))
    }
}

impl PlaybackSource for SpotifySession {
    fn current_playback(&mut self) -> std::result::Result<Option<PlaybackSnapshot>, ServiceError> {
        Ok(self.playback()?.map(|state| state.to_snapshot()))
    }

    fn set_device_volume(&mut self, percent: u8) -> std::result::Result<(), ServiceError> {
        Ok(self.set_volume(percent)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_config() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        config.set_spotify_client_id("client").unwrap();
        config.set_spotify_client_secret("secret").unwrap();
        (dir, config)
    }

    // Rien n'écoute sur ce port : un appel réseau échouerait
    fn offline_api() -> SpotifyApi {
        SpotifyApi::with_base_urls("http://127.0.0.1:9/v1", "http://127.0.0.1:9")
    }

    #[test]
    fn test_open_without_tokens() {
        let (_dir, config) = temp_config();
        assert!(matches!(
            SpotifySession::open_with_api(&config, offline_api()),
            Err(SpotifyError::NotAuthorized)
        ));
    }

    #[test]
    fn test_open_with_valid_token_needs_no_refresh() {
        let (_dir, config) = temp_config();
        let auth = AuthInfo {
            access_token: "still-valid".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: unix_now() + 3_600,
        };
        config.set_spotify_auth_info(&auth).unwrap();

        let session = SpotifySession::open_with_api(&config, offline_api()).unwrap();
        assert_eq!(session.auth_info(), &auth);
        assert_eq!(session.api.access_token(), Some("still-valid"));
        session.close();
    }

    #[test]
    fn test_expired_token_without_refresh_token() {
        let (_dir, config) = temp_config();
        config
            .set_spotify_auth_info(&AuthInfo {
                access_token: "expired".to_string(),
                refresh_token: None,
                expires_at: 1,
            })
            .unwrap();

        assert!(matches!(
            SpotifySession::open_with_api(&config, offline_api()),
            Err(SpotifyError::NotAuthorized)
        ));
    }
}
