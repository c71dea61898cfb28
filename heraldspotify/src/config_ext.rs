//! Extension pour intégrer la configuration Spotify dans heraldconfig
//!
//! Ce module fournit le trait `SpotifyConfigExt` qui ajoute à
//! `heraldconfig::Config` la gestion des identifiants de l'application et le
//! cache des tokens OAuth (section `accounts.spotify`).

use std::env;

use anyhow::{Result, anyhow};
use heraldconfig::{Config, encryption};
use serde_yaml::Value;
use tracing::warn;

use crate::api::auth::{AuthInfo, ClientCredentials, DEFAULT_REDIRECT_URI};

const ENV_CLIENT_ID: &str = "SPOTIFY_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "SPOTIFY_CLIENT_SECRET";

const CLIENT_ID: &[&str] = &["accounts", "spotify", "client_id"];
const CLIENT_SECRET: &[&str] = &["accounts", "spotify", "client_secret"];
const REDIRECT_URI: &[&str] = &["accounts", "spotify", "redirect_uri"];
const ACCESS_TOKEN: &[&str] = &["accounts", "spotify", "access_token"];
const REFRESH_TOKEN: &[&str] = &["accounts", "spotify", "refresh_token"];
const TOKEN_EXPIRES_AT: &[&str] = &["accounts", "spotify", "token_expires_at"];

/// Trait d'extension pour gérer la configuration Spotify dans heraldconfig
///
/// # Exemple
///
/// ```rust,ignore
/// use heraldconfig::Config;
/// use heraldspotify::SpotifyConfigExt;
///
/// let config = Config::load_config("")?;
/// let credentials = config.get_spotify_credentials()?;
/// println!("Spotify client: {}", credentials.client_id);
/// ```
pub trait SpotifyConfigExt {
    /// Client ID de l'application, ou variable `SPOTIFY_CLIENT_ID`
    fn get_spotify_client_id(&self) -> Result<String>;

    fn set_spotify_client_id(&self, client_id: &str) -> Result<()>;

    /// Client secret en clair (déchiffré si nécessaire), ou variable
    /// `SPOTIFY_CLIENT_SECRET`
    fn get_spotify_client_secret(&self) -> Result<String>;

    /// Enregistre le client secret, chiffré quand la machine le permet
    fn set_spotify_client_secret(&self, secret: &str) -> Result<()>;

    fn get_spotify_redirect_uri(&self) -> Result<String>;

    fn set_spotify_redirect_uri(&self, uri: &str) -> Result<()>;

    /// Récupère client id, secret et redirect URI
    ///
    /// # Errors
    ///
    /// Retourne une erreur si l'id ou le secret ne sont pas configurés
    fn get_spotify_credentials(&self) -> Result<ClientCredentials>;

    /// Tokens en cache, `None` si aucune autorisation n'a été faite
    fn get_spotify_auth_info(&self) -> Result<Option<AuthInfo>>;

    /// Sauvegarde les tokens dans la configuration
    fn set_spotify_auth_info(&self, auth: &AuthInfo) -> Result<()>;

    /// Supprime les tokens de la configuration
    fn clear_spotify_auth_info(&self) -> Result<()>;
}

fn non_empty_string(config: &Config, path: &[&str]) -> Option<String> {
    match config.get_value(path) {
        Ok(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Chiffre `secret`, ou le garde en clair si la clé machine est indisponible
fn protect(secret: &str) -> String {
    match encryption::encrypt_secret(secret) {
        Ok(encrypted) => encrypted,
        Err(e) => {
            warn!("Cannot encrypt secret, storing it in clear: {}", e);
            secret.to_string()
        }
    }
}

impl SpotifyConfigExt for Config {
    fn get_spotify_client_id(&self) -> Result<String> {
        non_empty_string(self, CLIENT_ID)
            .or_else(|| env_value(ENV_CLIENT_ID))
            .ok_or_else(|| anyhow!("Spotify client id not configured"))
    }

    fn set_spotify_client_id(&self, client_id: &str) -> Result<()> {
        self.set_value(CLIENT_ID, Value::String(client_id.to_string()))
    }

    fn get_spotify_client_secret(&self) -> Result<String> {
        match non_empty_string(self, CLIENT_SECRET) {
            Some(s) => encryption::get_secret(&s)
                .map_err(|e| anyhow!("Failed to decrypt client secret: {}", e)),
            None => env_value(ENV_CLIENT_SECRET)
                .ok_or_else(|| anyhow!("Spotify client secret not configured")),
        }
    }

    fn set_spotify_client_secret(&self, secret: &str) -> Result<()> {
        self.set_value(CLIENT_SECRET, Value::String(protect(secret)))
    }

    fn get_spotify_redirect_uri(&self) -> Result<String> {
        Ok(non_empty_string(self, REDIRECT_URI).unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()))
    }

    fn set_spotify_redirect_uri(&self, uri: &str) -> Result<()> {
        self.set_value(REDIRECT_URI, Value::String(uri.to_string()))
    }

    fn get_spotify_credentials(&self) -> Result<ClientCredentials> {
        Ok(ClientCredentials {
            client_id: self.get_spotify_client_id()?,
            client_secret: self.get_spotify_client_secret()?,
            redirect_uri: self.get_spotify_redirect_uri()?,
        })
    }

    fn get_spotify_auth_info(&self) -> Result<Option<AuthInfo>> {
        let Some(access_token) = non_empty_string(self, ACCESS_TOKEN) else {
            return Ok(None);
        };

        let refresh_token = match non_empty_string(self, REFRESH_TOKEN) {
            Some(s) => Some(
                encryption::get_secret(&s)
                    .map_err(|e| anyhow!("Failed to decrypt refresh token: {}", e))?,
            ),
            None => None,
        };

        Ok(Some(AuthInfo {
            access_token,
            refresh_token,
            expires_at: self.get_u64(TOKEN_EXPIRES_AT).unwrap_or(0),
        }))
    }

    fn set_spotify_auth_info(&self, auth: &AuthInfo) -> Result<()> {
        self.set_value(ACCESS_TOKEN, Value::String(auth.access_token.clone()))?;
        if let Some(refresh) = &auth.refresh_token {
            self.set_value(REFRESH_TOKEN, Value::String(protect(refresh)))?;
        }
        self.set_u64(TOKEN_EXPIRES_AT, auth.expires_at)
    }

    fn clear_spotify_auth_info(&self) -> Result<()> {
        self.set_value(ACCESS_TOKEN, Value::String(String::new()))?;
        self.set_value(REFRESH_TOKEN, Value::String(String::new()))?;
        self.set_u64(TOKEN_EXPIRES_AT, 0)
    }
}
