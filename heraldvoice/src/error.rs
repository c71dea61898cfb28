use heraldcore::PlaybackError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VoiceError>;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Nothing to say")]
    EmptyText,

    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),

    #[error("Speech service error (code {code}): {message}")]
    Synthesis { code: u16, message: String },

    #[error("MP3 decode error: {0}")]
    Decode(String),

    #[error("No audio output device available")]
    NoDevice,

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Audio stream error: {0}")]
    Stream(String),
}

impl From<VoiceError> for PlaybackError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::EmptyText | VoiceError::Http(_) | VoiceError::Synthesis { .. } => {
                PlaybackError::Synthesis(err.to_string())
            }
            VoiceError::Decode(_)
            | VoiceError::NoDevice
            | VoiceError::Device(_)
            | VoiceError::Stream(_) => PlaybackError::Output(err.to_string()),
        }
    }
}
