//! Couche d'accès à l'API Web Spotify
//!
//! Ce module fournit une interface bas-niveau et synchrone pour communiquer
//! avec l'API Spotify et avec son serveur d'autorisation.

pub mod auth;
pub mod player;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use ureq::{Agent, Body, http::Response};

use crate::error::{Result, SpotifyError};

/// URL de base de l'API Web
const API_BASE_URL: &str = "https://api.spotify.com/v1";
/// URL de base du serveur d'autorisation
const ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Client API bas-niveau pour communiquer avec Spotify
pub struct SpotifyApi {
    agent: Agent,
    api_url: String,
    accounts_url: String,
    /// Token d'accès OAuth courant
    access_token: Option<String>,
}

impl std::fmt::Debug for SpotifyApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyApi")
            .field("api_url", &self.api_url)
            .field("accounts_url", &self.accounts_url)
            .field("authorized", &self.access_token.is_some())
            .finish()
    }
}

impl Default for SpotifyApi {
    fn default() -> Self {
        Self::new()
    }
}

impl SpotifyApi {
    /// Crée une nouvelle instance de l'API
    pub fn new() -> Self {
        Self::with_base_urls(API_BASE_URL, ACCOUNTS_BASE_URL)
    }

    /// Crée une instance pointant vers d'autres serveurs (proxy, tests)
    pub fn with_base_urls(api_url: impl Into<String>, accounts_url: impl Into<String>) -> Self {
        // Les statuts 4xx/5xx ne sont pas des erreurs de transport : on veut
        // pouvoir lire le corps d'erreur Spotify.
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(HTTP_TIMEOUT))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            accounts_url: accounts_url.into().trim_end_matches('/').to_string(),
            access_token: None,
        }
    }

    /// Définit le token d'accès
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = Some(token.into());
    }

    /// Oublie le token d'accès
    pub fn clear_access_token(&mut self) {
        self.access_token = None;
    }

    /// Retourne le token d'accès si disponible
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn accounts_url(&self) -> &str {
        &self.accounts_url
    }

    fn bearer(&self) -> Result<String> {
        self.access_token
            .as_ref()
            .map(|token| format!("Bearer {}", token))
            .ok_or(SpotifyError::NotAuthorized)
    }

    /// Effectue une requête GET ; `None` si Spotify répond sans contenu
    pub(crate) fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let url = format!("{}{}", self.api_url, endpoint);
        debug!("GET {} with {} params", url, params.len());

        let response = self
            .agent
            .get(&url)
            .header("Authorization", self.bearer()?)
            .query_pairs(params.iter().copied())
            .call()?;

        match self.handle_response(response)? {
            Some(text) => parse_json(&text).map(Some),
            None => Ok(None),
        }
    }

    /// Effectue une requête PUT sans corps
    pub(crate) fn put(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<()> {
        let url = format!("{}{}", self.api_url, endpoint);
        debug!("PUT {} with {} params", url, params.len());

        let response = self
            .agent
            .put(&url)
            .header("Authorization", self.bearer()?)
            .query_pairs(params.iter().copied())
            .send_empty()?;

        self.handle_response(response)?;
        Ok(())
    }

    /// Effectue un POST de formulaire vers le serveur d'autorisation
    pub(crate) fn post_accounts_form<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        authorization: &str,
        form: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{}", self.accounts_url, endpoint);
        debug!("POST {} with {} fields", url, form.len());

        let response = self
            .agent
            .post(&url)
            .header("Authorization", authorization)
            .send_form(form.iter().copied())?;

        match self.handle_response(response)? {
            Some(text) => parse_json(&text),
            None => Err(SpotifyError::Other(format!("Empty response from {}", endpoint))),
        }
    }

    /// Traite la réponse HTTP
    ///
    /// Retourne le corps texte, ou `None` pour une réponse vide (`204`).
    fn handle_response(&self, mut response: Response<Body>) -> Result<Option<String>> {
        let status = response.status();
        let status_code = status.as_u16();

        debug!("Response status: {}", status);

        if !status.is_success() {
            if status_code == 429 {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("?");
                warn!("Spotify rate limit hit, retry after {} s", retry_after);
            }
            let error_text = response.body_mut().read_to_string().unwrap_or_default();
            let message = error_message(&error_text);
            warn!("API error ({}): {}", status_code, message);
            return Err(SpotifyError::from_status_code(status_code, message));
        }

        if status_code == 204 {
            return Ok(None);
        }

        let text = response.body_mut().read_to_string()?;
        if text.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }
}

fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| {
        warn!("Failed to parse response: {}", e);
        SpotifyError::JsonParse(e)
    })
}

/// Extrait un message lisible d'un corps d'erreur Spotify
///
/// L'API Web répond `{"error": {"status": 401, "message": "..."}}`, le
/// serveur d'autorisation `{"error": "invalid_grant", "error_description": "..."}`.
pub(crate) fn error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };

    match json.get("error") {
        Some(Value::Object(obj)) => obj
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string(),
        Some(Value::String(code)) => match json.get("error_description").and_then(|d| d.as_str()) {
            Some(description) => format!("{}: {}", code, description),
            None => code.clone(),
        },
        _ => body.trim().to_string(),
    }
}
