//! Gestion des erreurs pour le client Spotify

use heraldcore::ServiceError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SpotifyError>;

/// Failures of the Spotify Web API client and of the token cache.
#[derive(Error, Debug)]
pub enum SpotifyError {
    /// Token refusé ou expiré, ou credentials client invalides
    #[error("Spotify rejected the credentials: {0}")]
    Unauthorized(String),

    /// Aucun token en cache : l'autorisation n'a jamais été faite
    #[error("No Spotify authorization found, run `herald authorize` first")]
    NotAuthorized,

    /// 404, en pratique : aucun appareil actif
    #[error("Spotify resource not found: {0}")]
    NotFound(String),

    /// Échec réseau ou TLS
    #[error("Cannot reach Spotify: {0}")]
    Http(#[from] ureq::Error),

    /// Réponse JSON inattendue
    #[error("Unexpected Spotify payload: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Lecture ou écriture de `config.yaml`
    #[error("Herald configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// Erreur de configuration Spotify (client id, secret, redirect)
    #[error("Spotify configuration error: {0}")]
    Configuration(String),

    /// Erreur de l'API Spotify
    #[error("Spotify API error (code {code}): {message}")]
    ApiError { code: u16, message: String },

    /// 429
    #[error("Spotify rate limit reached")]
    RateLimitExceeded,

    /// Tout le reste
    #[error("Spotify error: {0}")]
    Other(String),
}

impl SpotifyError {
    /// Maps a non-2xx status of the Web API or the accounts service
    pub fn from_status_code(code: u16, message: impl Into<String>) -> Self {
        match code {
            401 => Self::Unauthorized(message.into()),
            404 => Self::NotFound(message.into()),
            429 => Self::RateLimitExceeded,
            _ => Self::ApiError {
                code,
                message: message.into(),
            },
        }
    }

    /// Vérifie si l'erreur impose une nouvelle autorisation
    ///
    /// `invalid_grant` est la réponse du serveur de tokens à un refresh
    /// token révoqué.
    pub fn is_auth_error(&self) -> bool {
        match self {
            SpotifyError::Unauthorized(_) | SpotifyError::NotAuthorized => true,
            SpotifyError::ApiError { code: 400, message } => message.contains("invalid_grant"),
            _ => false,
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, SpotifyError::RateLimitExceeded)
    }
}

impl From<SpotifyError> for ServiceError {
    fn from(err: SpotifyError) -> Self {
        if err.is_auth_error() {
            return ServiceError::Unauthorized(err.to_string());
        }
        match err {
            SpotifyError::RateLimitExceeded => ServiceError::RateLimited,
            SpotifyError::Http(e) => ServiceError::Transport(e.to_string()),
            SpotifyError::JsonParse(e) => ServiceError::InvalidResponse(e.to_string()),
            SpotifyError::ApiError { code, message } => ServiceError::Api { code, message },
            SpotifyError::NotFound(message) => ServiceError::Api { code: 404, message },
            other => ServiceError::Other(other.to_string()),
        }
    }
}
