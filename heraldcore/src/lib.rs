//! Announcement core for Herald.
//!
//! The crate watches a streaming service through the [`PlaybackSource`]
//! capability and speaks the artist name through a [`SpeechOutput`] whenever
//! the artist of the playing track changes. Everything that talks to the
//! outside world is a trait, so the whole loop runs against fakes in tests.
//!
//! Layering, leaf first:
//! - [`decision`]: pure "should we announce, and what" logic
//! - [`fade`]: device volume ramps around a blocking announcement
//! - [`watcher`]: one poll iteration and the session state it owns
//! - [`controller`]: the Stopped/Running state machine and its worker thread

pub mod capabilities;
pub mod controller;
pub mod decision;
pub mod errors;
pub mod events;
pub mod fade;
pub mod model;
pub mod watcher;

pub use capabilities::{Pacer, PhraseSelector, PlaybackSource, RandomSelector, SpeechOutput, ThreadPacer};
pub use controller::{Announcer, ControllerState, StartError};
pub use decision::{Decision, artist_key, decide};
pub use errors::{AnnounceError, ControllerError, PlaybackError, ServiceError};
pub use events::{Status, StatusBus};
pub use fade::{VolumeFader, announcement_volume, reduced_volume};
pub use model::{
    AnnouncementConfig, ItemKind, PlaybackSnapshot, SessionState, Track, UNKNOWN_ALBUM, UNKNOWN_SONG,
    Voice,
};
pub use watcher::AnnouncementLoop;
