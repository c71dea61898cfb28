//! MP3 -> PCM f32 entrelacé

use std::io::Cursor;
use std::time::Duration;

use minimp3::{Decoder as MiniMp3Decoder, Error as MiniMp3Error};
use tracing::{debug, warn};

use crate::error::{Result, VoiceError};

/// Decoded audio, interleaved samples in `[-1.0, 1.0]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Pcm {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Pcm {
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }
}

pub fn decode_mp3(bytes: &[u8]) -> Result<Pcm> {
    let mut decoder = MiniMp3Decoder::new(Cursor::new(bytes));
    let mut format: Option<(u32, u16)> = None;
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if frame.channels == 0 {
                    return Err(VoiceError::Decode("MP3 frame reported zero channels".into()));
                }
                let frame_format = (frame.sample_rate as u32, frame.channels as u16);
                match format {
                    None => format = Some(frame_format),
                    // Les morceaux concaténés partagent le même format
                    Some(expected) if expected != frame_format => {
                        warn!(?expected, found = ?frame_format, "Dropping MP3 frame with a different format");
                        continue;
                    }
                    Some(_) => {}
                }
                samples.extend(frame.data.iter().map(|s| f32::from(*s) / 32768.0));
            }
            Err(MiniMp3Error::Eof) => break,
            Err(MiniMp3Error::InsufficientData) | Err(MiniMp3Error::SkippedData) => continue,
            Err(MiniMp3Error::Io(err)) => return Err(VoiceError::Decode(err.to_string())),
        }
    }

    let Some((sample_rate, channels)) = format else {
        return Err(VoiceError::Decode("stream contained no decodable MP3 frames".into()));
    };

    let pcm = Pcm {
        samples,
        sample_rate,
        channels,
    };
    debug!(
        sample_rate,
        channels,
        duration_ms = pcm.duration().as_millis() as u64,
        "MP3 decoded"
    );
    Ok(pcm)
}
