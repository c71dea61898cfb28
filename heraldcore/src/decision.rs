//! Decides whether the current snapshot deserves an announcement.
//!
//! Nothing here sleeps or talks to the network: the caller gets back a
//! [`Decision`] and is responsible for waiting, announcing and updating the
//! session state.

use std::time::Duration;

use crate::capabilities::PhraseSelector;
use crate::model::{AnnouncementConfig, PlaybackSnapshot, Track};

/// In end-of-track mode, announce once this much time (or less) is left.
pub const END_OF_TRACK_WINDOW: Duration = Duration::from_secs(10);

/// Upper bound for the wait while approaching the end-of-track window.
pub const MAX_APPROACH_WAIT: Duration = Duration::from_secs(5);

/// Wait applied when the player holds something that is not a track.
pub const NON_TRACK_RETRY: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Player is paused or empty; nothing to announce.
    Idle,
    /// The item is an ad or an episode. Retry later, keep the state.
    Skip { retry_after: Duration },
    /// End-of-track mode and the window is not open yet.
    NotYet { retry_after: Duration },
    /// Same artist as the last announcement.
    Unchanged { artist_key: String },
    Announce { text: String, artist_key: String },
}

/// Canonical identity of "the current artists": names joined with `", "`.
pub fn artist_key(track: &Track) -> String {
    track.artist_names.join(", ")
}

/// Phrasings enabled by `config`, album first. Never empty.
pub fn candidate_phrases(track: &Track, artist: &str, config: &AnnouncementConfig) -> Vec<String> {
    let mut options = Vec::with_capacity(2);

    if config.include_album_titles {
        options.push(format!("{}, from the album {}.", artist, track.album_name));
    }

    if config.include_song_titles {
        options.push(format!("{}. {}.", artist, track.title));
    }

    if options.is_empty() {
        options.push(format!("{}.", artist));
    }

    options
}

/// Wait before re-polling while more than [`END_OF_TRACK_WINDOW`] remains.
///
/// Returns `None` once the window is open. The wait never exceeds
/// [`MAX_APPROACH_WAIT`] so the window cannot be slept through.
pub fn approach_wait(remaining: Duration) -> Option<Duration> {
    if remaining > END_OF_TRACK_WINDOW {
        Some((remaining - END_OF_TRACK_WINDOW).min(MAX_APPROACH_WAIT))
    } else {
        None
    }
}

pub fn decide(
    snapshot: &PlaybackSnapshot,
    previous_artist_key: Option<&str>,
    config: &AnnouncementConfig,
    selector: &mut dyn PhraseSelector,
) -> Decision {
    let track = match &snapshot.track {
        Some(track) if snapshot.is_playing => track,
        _ => return Decision::Idle,
    };

    if !track.kind.is_track() {
        return Decision::Skip {
            retry_after: NON_TRACK_RETRY,
        };
    }

    if !config.announce_at_track_start {
        let remaining = Duration::from_millis(snapshot.remaining_ms());
        if let Some(retry_after) = approach_wait(remaining) {
            return Decision::NotYet { retry_after };
        }
    }

    let key = artist_key(track);
    if previous_artist_key == Some(key.as_str()) {
        return Decision::Unchanged { artist_key: key };
    }

    let mut options = candidate_phrases(track, &key, config);
    let index = selector.choose(&options).min(options.len() - 1);
    let text = options.swap_remove(index);

    Decision::Announce {
        text,
        artist_key: key,
    }
}
