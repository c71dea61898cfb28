use thiserror::Error;

/// Failure of the streaming service (network, authentication, API).
///
/// The loop treats every variant as transient: it reports it and retries
/// after a back-off, even for credentials that will never work again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Authentication failed: {0}")]
    Unauthorized(String),
    #[error("Rate limit exceeded, please try again later")]
    RateLimited,
    #[error("Network error: {0}")]
    Transport(String),
    #[error("API error (code {code}): {message}")]
    Api { code: u16, message: String },
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
    #[error("{0}")]
    Other(String),
}

/// Failure of speech synthesis or audio output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),
    #[error("Audio output failed: {0}")]
    Output(String),
}

/// Anything that can abort one announcement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnounceError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

impl AnnounceError {
    /// Short category name used in status messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AnnounceError::Service(_) => "ServiceError",
            AnnounceError::Playback(_) => "PlaybackError",
        }
    }
}

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("The announcer is already running")]
    AlreadyRunning,
    #[error("Cannot spawn the announcer thread: {0}")]
    Spawn(String),
}
