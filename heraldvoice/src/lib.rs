//! # heraldvoice
//!
//! Turns announcement text into sound: Google Translate speech synthesis,
//! MP3 decoding with `minimp3`, and blocking playback through `cpal`.
//! [`AudioEngine`] ties the three together behind the
//! [`heraldcore::SpeechOutput`] trait.
//!
//! ```no_run
//! use heraldcore::{SpeechOutput, Voice};
//! use heraldvoice::AudioEngine;
//!
//! let mut engine = AudioEngine::open()?;
//! let audio = engine.synthesize("Joni Mitchell.", &Voice::default())?;
//! engine.play(&audio, 0.5)?;
//! engine.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod decoder;
pub mod engine;
pub mod error;
pub mod output;
pub mod tts;

pub use decoder::{Pcm, decode_mp3};
pub use engine::AudioEngine;
pub use error::{Result, VoiceError};
pub use tts::GoogleTts;
