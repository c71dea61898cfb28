//! Module d'autorisation OAuth pour l'API Spotify
//!
//! Flux "authorization code" : l'utilisateur ouvre l'URL d'autorisation, est
//! redirigé vers `redirect_uri?code=...`, et le code est échangé contre un
//! couple access/refresh token.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use super::SpotifyApi;
use crate::error::{Result, SpotifyError};

/// Scopes nécessaires : lecture de l'état du player et contrôle du volume
pub const SCOPES: &str = "user-read-playback-state user-modify-playback-state";

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8888/callback";

/// Un token qui expire dans moins de 60 s est rafraîchi avant usage
pub const EXPIRY_MARGIN_SECS: u64 = 60;

const TOKEN_ENDPOINT: &str = "/api/token";
const AUTHORIZE_ENDPOINT: &str = "/authorize";

/// Réponse de l'endpoint /api/token
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    expires_in: u64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// Identifiants de l'application enregistrée chez Spotify
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl ClientCredentials {
    /// En-tête `Authorization: Basic base64(id:secret)`
    fn basic_auth(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

/// Informations d'authentification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthInfo {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Expiration (Unix timestamp, secondes)
    pub expires_at: u64,
}

impl AuthInfo {
    fn from_response(response: TokenResponse, previous_refresh: Option<&str>, now: u64) -> Self {
        debug!(
            token_type = response.token_type.as_deref().unwrap_or("?"),
            scope = response.scope.as_deref().unwrap_or(""),
            expires_in = response.expires_in,
            "Token received"
        );
        Self {
            access_token: response.access_token,
            // Spotify ne renvoie pas toujours un nouveau refresh token
            refresh_token: response
                .refresh_token
                .or_else(|| previous_refresh.map(str::to_string)),
            expires_at: now + response.expires_in,
        }
    }

    /// Vrai si le token est expiré ou le sera dans la marge
    pub fn needs_refresh(&self, now: u64) -> bool {
        now + EXPIRY_MARGIN_SECS >= self.expires_at
    }
}

/// Heure courante en secondes Unix
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Extrait le code d'autorisation de l'URL de redirection collée par
/// l'utilisateur
///
/// # Errors
///
/// * `SpotifyError::Unauthorized` - l'utilisateur a refusé l'accès
/// * `SpotifyError::Configuration` - URL invalide ou sans code
pub fn extract_code(redirect_url: &str) -> Result<String> {
    let url = Url::parse(redirect_url.trim())
        .map_err(|e| SpotifyError::Configuration(format!("Invalid redirect URL: {}", e)))?;

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => {
                return Err(SpotifyError::Unauthorized(format!(
                    "Authorization refused: {}",
                    value
                )));
            }
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            _ => {}
        }
    }

    code.ok_or_else(|| {
        SpotifyError::Configuration("No authorization code in redirect URL".to_string())
    })
}

impl SpotifyApi {
    /// Construit l'URL à ouvrir dans un navigateur pour autoriser l'application
    pub fn authorize_url(&self, credentials: &ClientCredentials) -> Result<String> {
        let base = format!("{}{}", self.accounts_url, AUTHORIZE_ENDPOINT);
        let url = Url::parse_with_params(
            &base,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", credentials.redirect_uri.as_str()),
                ("scope", SCOPES),
            ],
        )
        .map_err(|e| SpotifyError::Configuration(format!("Invalid accounts URL: {}", e)))?;
        Ok(url.into())
    }

    /// Échange un code d'autorisation contre des tokens
    ///
    /// Le token d'accès obtenu devient le token courant de l'API.
    pub fn exchange_code(
        &mut self,
        credentials: &ClientCredentials,
        code: &str,
    ) -> Result<AuthInfo> {
        info!("Exchanging Spotify authorization code");

        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", credentials.redirect_uri.as_str()),
        ];
        let response: TokenResponse =
            self.post_accounts_form(TOKEN_ENDPOINT, &credentials.basic_auth(), &form)?;

        let auth = AuthInfo::from_response(response, None, unix_now());
        self.set_access_token(auth.access_token.clone());
        Ok(auth)
    }

    /// Obtient un nouveau token d'accès à partir d'un refresh token
    pub fn refresh(
        &mut self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<AuthInfo> {
        info!("Refreshing Spotify access token");

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let response: TokenResponse =
            self.post_accounts_form(TOKEN_ENDPOINT, &credentials.basic_auth(), &form)?;

        let auth = AuthInfo::from_response(response, Some(refresh_token), unix_now());
        self.set_access_token(auth.access_token.clone());
        Ok(auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> ClientCredentials {
        ClientCredentials {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
        }
    }

    #[test]
    fn test_basic_auth_header() {
        assert_eq!(credentials().basic_auth(), "Basic Y2xpZW50OnNlY3JldA==");
    }

    #[test]
    fn test_authorize_url() {
        let api = SpotifyApi::new();
        let url = api.authorize_url(&credentials()).unwrap();
        assert!(url.starts_with("https://accounts.spotify.com/authorize?"));

        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".to_string(), "client".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("redirect_uri".to_string(), DEFAULT_REDIRECT_URI.to_string())));
        assert!(pairs.contains(&("scope".to_string(), SCOPES.to_string())));
    }

    #[test]
    fn test_extract_code() {
        assert_eq!(
            extract_code("http://localhost:8888/callback?code=AQB12-x_y&state=abc\n").unwrap(),
            "AQB12-x_y"
        );
        assert!(matches!(
            extract_code("http://localhost:8888/callback?error=access_denied"),
            Err(SpotifyError::Unauthorized(_))
        ));
        assert!(matches!(
            extract_code("http://localhost:8888/callback"),
            Err(SpotifyError::Configuration(_))
        ));
        assert!(matches!(
            extract_code("not a url"),
            Err(SpotifyError::Configuration(_))
        ));
    }

    #[test]
    fn test_refresh_keeps_previous_refresh_token() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"new","token_type":"Bearer","expires_in":3600,"scope":"user-read-playback-state"}"#,
        )
        .unwrap();
        let auth = AuthInfo::from_response(response, Some("old-refresh"), 1_000);
        assert_eq!(auth.access_token, "new");
        assert_eq!(auth.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(auth.expires_at, 4_600);
    }

    #[test]
    fn test_needs_refresh_margin() {
        let auth = AuthInfo {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at: 1_000,
        };
        assert!(!auth.needs_refresh(939));
        assert!(auth.needs_refresh(940));
        assert!(auth.needs_refresh(2_000));
    }
}
