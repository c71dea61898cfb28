//! Status messages from the announcement worker.
//!
//! The worker never prints anything itself: it broadcasts [`Status`] values
//! on a [`StatusBus`] and the front end decides how to show them.

use std::fmt;
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender, unbounded};

/// Human-readable progress pushed from the worker to whoever displays it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Started,
    Stopped,
    NoPlayback,
    Listening { title: String, artist: String },
    Error { kind: String, message: String },
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Started => write!(f, "Spotify Announcer is running."),
            Status::Stopped => write!(f, "Spotify Announcer is off."),
            Status::NoPlayback => write!(f, "No track is currently playing."),
            Status::Listening { title, artist } => {
                write!(f, "Listening to Spotify: {} by {}", title, artist)
            }
            Status::Error { kind, message } => write!(f, "Error: {} - {}", kind, message),
        }
    }
}

/// One-way fan-out of [`Status`] messages. Dropped receivers are pruned on
/// the next broadcast.
#[derive(Clone, Default)]
pub struct StatusBus {
    subscribers: Arc<Mutex<Vec<Sender<Status>>>>,
}

impl StatusBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<Status> {
        let (tx, rx) = unbounded::<Status>();
        {
            let mut subscribers = self.subscribers.lock().unwrap();
            subscribers.push(tx);
        }
        rx
    }

    pub fn broadcast(&self, status: Status) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(status.clone()).is_ok());
    }
}

impl fmt::Debug for StatusBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.subscribers.lock().map(|s| s.len()).unwrap_or(0);
        f.debug_struct("StatusBus").field("subscribers", &count).finish()
    }
}
