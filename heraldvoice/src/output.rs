//! Lecture bloquante d'un buffer PCM sur une sortie cpal

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, SupportedStreamConfig};
use tracing::{debug, error};

use crate::decoder::Pcm;
use crate::error::{Result, VoiceError};

const DRAIN_POLL: Duration = Duration::from_millis(10);
/// Laisse au périphérique le temps de jouer son propre buffer
const DRAIN_TAIL: Duration = Duration::from_millis(150);
/// Marge au-delà de la durée du son avant d'abandonner
const PLAYBACK_GRACE: Duration = Duration::from_secs(5);

/// Buffer partagé entre le thread appelant et le callback cpal
struct SharedBuffer {
    samples: VecDeque<f32>,
    failed: Option<String>,
}

pub fn default_output_device() -> Result<Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or(VoiceError::NoDevice)
}

pub fn device_name(device: &Device) -> String {
    device.name().unwrap_or_else(|_| "Unknown".to_string())
}

/// Picks an f32 output configuration running at `sample_rate` if the device
/// offers one, otherwise the device default.
fn choose_config(device: &Device, sample_rate: u32, channels: u16) -> Result<SupportedStreamConfig> {
    if let Ok(ranges) = device.supported_output_configs() {
        let mut matching: Vec<_> = ranges
            .filter(|r| r.sample_format() == SampleFormat::F32)
            .filter(|r| r.min_sample_rate().0 <= sample_rate && sample_rate <= r.max_sample_rate().0)
            .collect();
        matching.sort_by_key(|r| r.channels() != channels);
        if let Some(range) = matching.into_iter().next() {
            return Ok(range.with_sample_rate(SampleRate(sample_rate)));
        }
    }

    device
        .default_output_config()
        .map_err(|e| VoiceError::Device(format!("Failed to get output config: {}", e)))
}

/// Plays `pcm` on `device` at `volume` (0.0 to 1.0) and returns once the
/// whole buffer has been played.
pub fn play_blocking(device: &Device, pcm: &Pcm, volume: f32) -> Result<()> {
    let config = choose_config(device, pcm.sample_rate, pcm.channels)?;
    let out_channels = config.channels();
    let out_rate = config.sample_rate().0;

    debug!(
        "Output config: {} channels, {} Hz, {:?}",
        out_channels,
        out_rate,
        config.sample_format()
    );

    let samples = prepare(pcm, out_channels, out_rate, volume);
    let expected = Duration::from_secs_f64(
        samples.len() as f64 / f64::from(out_channels.max(1)) / f64::from(out_rate.max(1)),
    );

    let buffer = Arc::new(Mutex::new(SharedBuffer {
        samples: samples.into(),
        failed: None,
    }));
    let buffer_cb = buffer.clone();
    let buffer_err = buffer.clone();

    let stream = device
        .build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut buf = buffer_cb.lock().unwrap();
                for sample in data.iter_mut() {
                    *sample = buf.samples.pop_front().unwrap_or(0.0);
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
                buffer_err.lock().unwrap().failed = Some(err.to_string());
            },
            None,
        )
        .map_err(|e| VoiceError::Stream(format!("Failed to build output stream: {}", e)))?;

    stream
        .play()
        .map_err(|e| VoiceError::Stream(format!("Failed to play stream: {}", e)))?;

    let deadline = Instant::now() + expected + PLAYBACK_GRACE;
    loop {
        {
            let buf = buffer.lock().unwrap();
            if let Some(message) = &buf.failed {
                return Err(VoiceError::Stream(message.clone()));
            }
            if buf.samples.is_empty() {
                break;
            }
        }
        if Instant::now() > deadline {
            return Err(VoiceError::Stream("Playback did not complete in time".into()));
        }
        thread::sleep(DRAIN_POLL);
    }

    thread::sleep(DRAIN_TAIL);
    drop(stream);
    debug!(duration_ms = expected.as_millis() as u64, "Announcement played");
    Ok(())
}

/// Converts `pcm` to the device layout and applies the gain.
pub fn prepare(pcm: &Pcm, out_channels: u16, out_rate: u32, volume: f32) -> Vec<f32> {
    let volume = volume.clamp(0.0, 1.0);
    let mapped = map_channels(&pcm.samples, pcm.channels, out_channels);
    let mut resampled = resample_linear(&mapped, out_channels, pcm.sample_rate, out_rate);
    for sample in resampled.iter_mut() {
        *sample = (*sample * volume).clamp(-1.0, 1.0);
    }
    resampled
}

/// Re-lays interleaved frames from `from` channels to `to` channels.
///
/// Mono is copied to every output channel; going down to mono averages the
/// input channels; otherwise channels are copied by index and missing ones
/// repeat the last input channel.
pub fn map_channels(samples: &[f32], from: u16, to: u16) -> Vec<f32> {
    let from = usize::from(from.max(1));
    let to = usize::from(to.max(1));
    if from == to {
        return samples.to_vec();
    }

    let mut out = Vec::with_capacity(samples.len() / from * to);
    for frame in samples.chunks_exact(from) {
        if to == 1 {
            out.push(frame.iter().sum::<f32>() / from as f32);
        } else {
            for channel in 0..to {
                out.push(frame[channel.min(from - 1)]);
            }
        }
    }
    out
}

/// Linear-interpolation resampler over interleaved frames.
pub fn resample_linear(samples: &[f32], channels: u16, from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let channels = usize::from(channels.max(1));
    let in_frames = samples.len() / channels;
    if in_frames == 0 {
        return Vec::new();
    }

    let out_frames = (in_frames as u64 * u64::from(to_rate) / u64::from(from_rate)) as usize;
    let step = f64::from(from_rate) / f64::from(to_rate);
    let mut out = Vec::with_capacity(out_frames * channels);

    for i in 0..out_frames {
        let position = i as f64 * step;
        let index = position as usize;
        let frac = (position - index as f64) as f32;
        let next = (index + 1).min(in_frames - 1);
        for channel in 0..channels {
            let a = samples[index * channels + channel];
            let b = samples[next * channels + channel];
            out.push(a + (b - a) * frac);
        }
    }
    out
}
