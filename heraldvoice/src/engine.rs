use cpal::Device;
use heraldcore::{PlaybackError, SpeechOutput, Voice};
use tracing::{debug, info};

use crate::decoder::decode_mp3;
use crate::error::Result;
use crate::output::{default_output_device, device_name, play_blocking};
use crate::tts::GoogleTts;

/// Speech synthesis plus local playback on one output device.
///
/// Opened once per run and handed to the announcement loop; the device is
/// chosen at [`AudioEngine::open`] and kept until [`AudioEngine::close`].
pub struct AudioEngine {
    tts: GoogleTts,
    device: Device,
    device_name: String,
}

impl std::fmt::Debug for AudioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEngine")
            .field("device", &self.device_name)
            .finish()
    }
}

impl AudioEngine {
    /// Selects the default output device.
    pub fn open() -> Result<Self> {
        let device = default_output_device()?;
        let device_name = device_name(&device);
        info!(device = %device_name, "Audio engine opened");
        Ok(Self {
            tts: GoogleTts::new(),
            device,
            device_name,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn close(self) {
        info!(device = %self.device_name, "Audio engine closed");
    }
}

impl SpeechOutput for AudioEngine {
    fn synthesize(&mut self, text: &str, voice: &Voice) -> std::result::Result<Vec<u8>, PlaybackError> {
        Ok(self.tts.synthesize(text, voice)?)
    }

    fn play(&mut self, audio: &[u8], volume: f32) -> std::result::Result<(), PlaybackError> {
        let pcm = decode_mp3(audio)?;
        debug!(volume, device = %self.device_name, "Playing speech");
        play_blocking(&self.device, &pcm, volume)?;
        Ok(())
    }
}
