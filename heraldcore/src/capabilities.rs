// heraldcore/src/capabilities.rs
use std::time::Duration;

use rand::Rng;

use crate::errors::{PlaybackError, ServiceError};
use crate::model::{PlaybackSnapshot, Voice};

/// Read and volume access to the streaming service's active device.
///
/// Authentication, token refresh and caching are the implementor's business;
/// the loop only sees snapshots and [`ServiceError`]s.
pub trait PlaybackSource {
    /// Reads the current playback.
    ///
    /// `Ok(None)` means there is no device or item at all, which is not the
    /// same thing as a paused track.
    fn current_playback(&mut self) -> Result<Option<PlaybackSnapshot>, ServiceError>;

    /// Sets the active device volume, in percent.
    fn set_device_volume(&mut self, percent: u8) -> Result<(), ServiceError>;
}

/// Text-to-speech plus audio output.
pub trait SpeechOutput {
    /// Turns `text` into encoded audio.
    fn synthesize(&mut self, text: &str, voice: &Voice) -> Result<Vec<u8>, PlaybackError>;

    /// Plays encoded audio at `volume` (0.0 to 1.0) and returns once playback
    /// has finished.
    fn play(&mut self, audio: &[u8], volume: f32) -> Result<(), PlaybackError>;
}

/// Picks one phrasing among the enabled candidates.
pub trait PhraseSelector {
    /// Returns an index into `candidates`, which is never empty.
    fn choose(&mut self, candidates: &[String]) -> usize;
}

/// Uniform random choice, so consecutive announcements vary.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomSelector;

impl PhraseSelector for RandomSelector {
    fn choose(&mut self, candidates: &[String]) -> usize {
        rand::rng().random_range(0..candidates.len())
    }
}

/// Blocking delay used between fade steps.
pub trait Pacer {
    fn pause(&self, duration: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<T: PlaybackSource + ?Sized> PlaybackSource for Box<T> {
    fn current_playback(&mut self) -> Result<Option<PlaybackSnapshot>, ServiceError> {
        (**self).current_playback()
    }

    fn set_device_volume(&mut self, percent: u8) -> Result<(), ServiceError> {
        (**self).set_device_volume(percent)
    }
}

impl<T: SpeechOutput + ?Sized> SpeechOutput for Box<T> {
    fn synthesize(&mut self, text: &str, voice: &Voice) -> Result<Vec<u8>, PlaybackError> {
        (**self).synthesize(text, voice)
    }

    fn play(&mut self, audio: &[u8], volume: f32) -> Result<(), PlaybackError> {
        (**self).play(audio, volume)
    }
}
