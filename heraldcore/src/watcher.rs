//! The announcement poll loop.
//!
//! [`AnnouncementLoop`] owns the collaborators and the [`SessionState`] of one
//! session. Each call to [`AnnouncementLoop::run_iteration`] performs a single
//! poll and returns how long to wait before the next one; the controller does
//! the waiting so that a stop request can cut it short.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::capabilities::{Pacer, PhraseSelector, PlaybackSource, RandomSelector, SpeechOutput};
use crate::decision::{Decision, artist_key, decide};
use crate::errors::AnnounceError;
use crate::events::{Status, StatusBus};
use crate::fade::VolumeFader;
use crate::model::{AnnouncementConfig, ItemKind, PlaybackSnapshot, SessionState, Voice};

/// Wait after a successful iteration.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Wait when nothing is loaded on the player.
pub const NO_PLAYBACK_RETRY: Duration = Duration::from_secs(5);
/// Back-off after any error.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(10);

pub struct AnnouncementLoop<P, S> {
    source: P,
    speech: S,
    config: AnnouncementConfig,
    voice: Voice,
    selector: Box<dyn PhraseSelector + Send>,
    fader: VolumeFader,
    state: SessionState,
    status: StatusBus,
}

impl<P, S> std::fmt::Debug for AnnouncementLoop<P, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnouncementLoop")
            .field("config", &self.config)
            .field("voice", &self.voice)
            .field("state", &self.state)
            .finish()
    }
}

impl<P: PlaybackSource, S: SpeechOutput> AnnouncementLoop<P, S> {
    pub fn new(source: P, speech: S, config: AnnouncementConfig) -> Self {
        Self {
            source,
            speech,
            config,
            voice: Voice::default(),
            selector: Box::new(RandomSelector),
            fader: VolumeFader::default(),
            state: SessionState::default(),
            status: StatusBus::new(),
        }
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.voice = voice;
        self
    }

    pub fn with_selector(mut self, selector: impl PhraseSelector + Send + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    /// Replaces the delay used between fade steps.
    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer + Send + Sync>) -> Self {
        self.fader = VolumeFader::new(pacer);
        self
    }

    pub fn with_status_bus(mut self, status: StatusBus) -> Self {
        self.status = status;
        self
    }

    pub fn config(&self) -> &AnnouncementConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionState {
        &self.state
    }

    pub(crate) fn set_running(&mut self, running: bool) {
        self.state.running = running;
    }

    /// Hands the collaborators back once the loop is over.
    pub fn into_parts(self) -> (P, S) {
        (self.source, self.speech)
    }

    /// Performs one poll and returns the wait before the next one.
    ///
    /// Errors never escape: they are reported on the status bus and turned
    /// into [`ERROR_BACKOFF`].
    pub fn run_iteration(&mut self) -> Duration {
        match self.poll_once() {
            Ok(wait) => wait,
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "Announcement iteration failed");
                self.status.broadcast(Status::Error {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                });
                ERROR_BACKOFF
            }
        }
    }

    fn poll_once(&mut self) -> Result<Duration, AnnounceError> {
        let snapshot = match self.source.current_playback()? {
            Some(snapshot) if snapshot.track.is_some() => snapshot,
            _ => {
                debug!("No playback context");
                self.status.broadcast(Status::NoPlayback);
                return Ok(NO_PLAYBACK_RETRY);
            }
        };

        let decision = decide(
            &snapshot,
            self.state.previous_artist_key.as_deref(),
            &self.config,
            self.selector.as_mut(),
        );

        match decision {
            Decision::Skip { retry_after } => {
                debug!("Current item is not a track, skipping");
                // Une pub arrive sans item : rien à afficher
                if snapshot.track.as_ref().is_some_and(|t| t.kind == ItemKind::Ad) {
                    self.status.broadcast(Status::NoPlayback);
                }
                return Ok(retry_after);
            }
            Decision::NotYet { retry_after } => {
                debug!(
                    remaining_ms = snapshot.remaining_ms(),
                    wait_ms = retry_after.as_millis() as u64,
                    "Waiting for the end-of-track window"
                );
                return Ok(retry_after);
            }
            Decision::Announce { text, artist_key } => {
                info!(artist = %artist_key, "Announcing {}", text);
                self.fader.fade_and_announce(
                    &mut self.source,
                    &mut self.speech,
                    &self.voice,
                    snapshot.device_volume,
                    &text,
                )?;
                self.state.previous_artist_key = Some(artist_key);
            }
            Decision::Idle | Decision::Unchanged { .. } => {}
        }

        self.report_listening(&snapshot);
        Ok(POLL_INTERVAL)
    }

    fn report_listening(&self, snapshot: &PlaybackSnapshot) {
        if let Some(track) = &snapshot.track {
            self.status.broadcast(Status::Listening {
                title: track.title.clone(),
                artist: artist_key(track),
            });
        }
    }
}
