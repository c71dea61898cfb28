#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use heraldcore::{
    ItemKind, Pacer, PhraseSelector, PlaybackError, PlaybackSnapshot, PlaybackSource,
    ServiceError, SpeechOutput, Track, Voice,
};

pub fn track(artist: &str, title: &str, kind: ItemKind) -> Track {
    Track::new(
        artist.split(" & ").map(str::to_string).collect(),
        Some("Greatest Hits".to_string()),
        Some(title.to_string()),
        200_000,
        kind,
    )
}

pub fn playing(artist: &str, title: &str, volume: u8, progress_ms: u64) -> PlaybackSnapshot {
    let track = track(artist, title, ItemKind::Track);
    PlaybackSnapshot {
        is_playing: true,
        device_volume: volume,
        duration_ms: track.duration_ms,
        track: Some(track),
        progress_ms,
    }
}

/// Replays a fixed list of poll results, then reports no playback.
#[derive(Default)]
pub struct ScriptedSource {
    script: VecDeque<Result<Option<PlaybackSnapshot>, ServiceError>>,
    pub volumes: Arc<Mutex<Vec<u8>>>,
    pub fail_volume: bool,
}

impl ScriptedSource {
    pub fn new<I>(script: I) -> Self
    where
        I: IntoIterator<Item = Result<Option<PlaybackSnapshot>, ServiceError>>,
    {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn snapshots<I: IntoIterator<Item = PlaybackSnapshot>>(snapshots: I) -> Self {
        Self::new(snapshots.into_iter().map(|s| Ok(Some(s))))
    }
}

impl PlaybackSource for ScriptedSource {
    fn current_playback(&mut self) -> Result<Option<PlaybackSnapshot>, ServiceError> {
        self.script.pop_front().unwrap_or(Ok(None))
    }

    fn set_device_volume(&mut self, percent: u8) -> Result<(), ServiceError> {
        if self.fail_volume {
            return Err(ServiceError::Transport("connection reset".to_string()));
        }
        self.volumes.lock().unwrap().push(percent);
        Ok(())
    }
}

/// Speech output that "plays" the synthesized text back into a list.
#[derive(Default)]
pub struct RecordingSpeech {
    pub played: Arc<Mutex<Vec<(String, f32)>>>,
    /// Number of upcoming `play` calls that fail.
    pub failures: usize,
}

impl SpeechOutput for RecordingSpeech {
    fn synthesize(&mut self, text: &str, _voice: &Voice) -> Result<Vec<u8>, PlaybackError> {
        Ok(text.as_bytes().to_vec())
    }

    fn play(&mut self, audio: &[u8], volume: f32) -> Result<(), PlaybackError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(PlaybackError::Output("device unplugged".to_string()));
        }
        self.played
            .lock()
            .unwrap()
            .push((String::from_utf8_lossy(audio).to_string(), volume));
        Ok(())
    }
}

pub struct FixedSelector(pub usize);

impl PhraseSelector for FixedSelector {
    fn choose(&mut self, _candidates: &[String]) -> usize {
        self.0
    }
}

/// Records fade delays instead of sleeping.
#[derive(Default)]
pub struct NoPause {
    pub pauses: Mutex<Vec<Duration>>,
}

impl Pacer for NoPause {
    fn pause(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }
}

/// Speech output whose playback takes `duration`.
pub struct SlowSpeech {
    pub duration: Duration,
    pub started: Arc<AtomicBool>,
    pub finished: Arc<AtomicBool>,
}

impl SlowSpeech {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            started: Arc::new(AtomicBool::new(false)),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SpeechOutput for SlowSpeech {
    fn synthesize(&mut self, text: &str, _voice: &Voice) -> Result<Vec<u8>, PlaybackError> {
        Ok(text.as_bytes().to_vec())
    }

    fn play(&mut self, _audio: &[u8], _volume: f32) -> Result<(), PlaybackError> {
        self.started.store(true, Ordering::SeqCst);
        std::thread::sleep(self.duration);
        self.finished.store(true, Ordering::SeqCst);
        Ok(())
    }
}
