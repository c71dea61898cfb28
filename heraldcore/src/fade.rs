//! Volume ramps around a spoken announcement.
//!
//! The device volume is lowered a little, the announcement is played on the
//! local audio output, then the device volume goes back to where it was.
//! Every phase is sequential; the first failure aborts what is left.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::capabilities::{Pacer, PlaybackSource, SpeechOutput, ThreadPacer};
use crate::errors::{AnnounceError, ServiceError};
use crate::model::Voice;

/// Device volume multiplier while the announcement plays.
pub const VOLUME_FACTOR: f64 = 0.9;
pub const FADE_STEPS: u32 = 8;
pub const FADE_DURATION: Duration = Duration::from_millis(200);

const MIN_DEVICE_VOLUME: u8 = 1;
const MAX_DEVICE_VOLUME: u8 = 100;

/// Device volume offset below which the announcement is silent.
const ANNOUNCEMENT_FLOOR: f64 = 0.1;
const ANNOUNCEMENT_EXPONENT: f64 = 2.5;

/// Device volume used during the announcement: `max(1, round(current * 0.9))`.
pub fn reduced_volume(current: u8) -> u8 {
    let reduced = (f64::from(current) * VOLUME_FACTOR).round() as i64;
    reduced.clamp(i64::from(MIN_DEVICE_VOLUME), i64::from(u8::MAX)) as u8
}

/// Speech volume derived from the device volume: `(current/100 - 0.1)^2.5`.
///
/// The base is clamped at zero first, so any device volume at or below 10 %
/// gives a silent announcement instead of an undefined power.
pub fn announcement_volume(current: u8) -> f32 {
    let base = (f64::from(current) / 100.0 - ANNOUNCEMENT_FLOOR).max(0.0);
    base.powf(ANNOUNCEMENT_EXPONENT).clamp(0.0, 1.0) as f32
}

fn clamp_device_volume(value: i32) -> u8 {
    value.clamp(i32::from(MIN_DEVICE_VOLUME), i32::from(MAX_DEVICE_VOLUME)) as u8
}

/// Volumes commanded by one ramp: `steps` interpolated values starting at
/// `from`, then `to` itself. Each value is clamped to 1..=100.
pub fn ramp(from: u8, to: u8, steps: u32) -> Vec<u8> {
    let steps = steps.max(1);
    let step_size = (f64::from(to) - f64::from(from)) / f64::from(steps);

    let mut levels: Vec<u8> = (0..steps)
        .map(|step| clamp_device_volume((f64::from(from) + f64::from(step) * step_size) as i32))
        .collect();
    levels.push(clamp_device_volume(i32::from(to)));
    levels
}

/// Runs the fade-out / speak / fade-in sequence.
#[derive(Clone)]
pub struct VolumeFader {
    steps: u32,
    duration: Duration,
    pacer: Arc<dyn Pacer + Send + Sync>,
}

impl std::fmt::Debug for VolumeFader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeFader")
            .field("steps", &self.steps)
            .field("duration", &self.duration)
            .finish()
    }
}

impl Default for VolumeFader {
    fn default() -> Self {
        Self::new(Arc::new(ThreadPacer))
    }
}

impl VolumeFader {
    pub fn new(pacer: Arc<dyn Pacer + Send + Sync>) -> Self {
        Self {
            steps: FADE_STEPS,
            duration: FADE_DURATION,
            pacer,
        }
    }

    fn step_delay(&self) -> Duration {
        self.duration / self.steps.max(1)
    }

    /// Moves the device volume from `from` to `to` in discrete steps.
    pub fn ramp_volume(
        &self,
        source: &mut dyn PlaybackSource,
        from: u8,
        to: u8,
    ) -> Result<(), ServiceError> {
        let delay = self.step_delay();
        let levels = ramp(from, to, self.steps);

        for (index, level) in levels.iter().enumerate() {
            debug!(volume = level, "Fade step");
            source.set_device_volume(*level)?;
            // No pause after the final set to the exact target
            if index + 1 < levels.len() {
                self.pacer.pause(delay);
            }
        }

        Ok(())
    }

    /// Lowers the device volume, speaks `text`, restores the volume.
    ///
    /// Blocks until the announcement has been played. A failure in any phase
    /// aborts the remaining ones, so a failed playback leaves the device at
    /// the reduced volume.
    pub fn fade_and_announce(
        &self,
        source: &mut dyn PlaybackSource,
        speech: &mut dyn SpeechOutput,
        voice: &Voice,
        current_volume: u8,
        text: &str,
    ) -> Result<(), AnnounceError> {
        let reduced = reduced_volume(current_volume);

        self.ramp_volume(source, current_volume, reduced)?;

        let audio = speech.synthesize(text, voice)?;
        let volume = announcement_volume(current_volume);
        debug!(text, volume, "Playing announcement");
        speech.play(&audio, volume)?;

        self.ramp_volume(source, reduced, current_volume)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduced_volume() {
        assert_eq!(reduced_volume(100), 90);
        assert_eq!(reduced_volume(50), 45);
        // round(4.5) = 5
        assert_eq!(reduced_volume(5), 5);
        assert_eq!(reduced_volume(1), 1);
        assert_eq!(reduced_volume(0), 1);
    }

    #[test]
    fn test_announcement_volume() {
        assert!((announcement_volume(100) - 0.9f32.powf(2.5)).abs() < 1e-6);
        assert_eq!(announcement_volume(10), 0.0);
        assert_eq!(announcement_volume(5), 0.0);
        assert_eq!(announcement_volume(0), 0.0);
        assert!(announcement_volume(11) > 0.0);
    }

    #[test]
    fn test_ramp_down_and_up() {
        assert_eq!(ramp(100, 90, 8), vec![100, 98, 97, 96, 95, 93, 92, 91, 90]);
        assert_eq!(ramp(90, 100, 8), vec![90, 91, 92, 93, 95, 96, 97, 98, 100]);
    }

    #[test]
    fn test_ramp_clamps_to_device_range() {
        assert!(ramp(0, 1, 8).iter().all(|v| *v >= 1));
        assert_eq!(ramp(5, 5, 8), vec![5; 9]);
    }
}
