mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use common::{FixedSelector, NoPause, RecordingSpeech, ScriptedSource, playing, track};
use heraldcore::fade::{FADE_DURATION, FADE_STEPS};
use heraldcore::{
    AnnouncementConfig, AnnouncementLoop, ItemKind, PlaybackSnapshot, RandomSelector,
    ServiceError, Status, StatusBus,
};

const AT_START: AnnouncementConfig = AnnouncementConfig {
    include_song_titles: false,
    include_album_titles: false,
    announce_at_track_start: true,
};

fn announcement_loop(
    source: ScriptedSource,
    speech: RecordingSpeech,
    config: AnnouncementConfig,
) -> AnnouncementLoop<ScriptedSource, RecordingSpeech> {
    AnnouncementLoop::new(source, speech, config)
        .with_selector(FixedSelector(0))
        .with_pacer(Arc::new(NoPause::default()))
}

#[test]
fn test_announces_once_per_artist_change() {
    let source = ScriptedSource::snapshots([
        playing("Joni Mitchell", "River", 100, 0),
        playing("Joni Mitchell", "River", 100, 1_000),
        playing("Joni Mitchell", "Blue", 100, 0),
        playing("Nina Simone", "Sinnerman", 100, 0),
        playing("Nina Simone", "Sinnerman", 100, 1_000),
    ]);
    let speech = RecordingSpeech::default();
    let played = speech.played.clone();
    let volumes = source.volumes.clone();
    let mut lp = announcement_loop(source, speech, AT_START);

    for _ in 0..5 {
        assert_eq!(lp.run_iteration(), Duration::from_secs(1));
    }

    let texts: Vec<String> = played.lock().unwrap().iter().map(|(t, _)| t.clone()).collect();
    assert_eq!(texts, vec!["Joni Mitchell.", "Nina Simone."]);
    assert_eq!(
        lp.session().previous_artist_key.as_deref(),
        Some("Nina Simone")
    );

    // Two fades of 9 steps down and 9 steps up
    let volumes = volumes.lock().unwrap();
    assert_eq!(volumes.len(), 36);
    assert_eq!(volumes[0], 100);
    assert_eq!(volumes[8], 90);
    assert_eq!(volumes[17], 100);
}

#[test]
fn test_fade_restores_volume_and_scales_speech() {
    let source = ScriptedSource::snapshots([playing("Joni Mitchell", "River", 60, 0)]);
    let speech = RecordingSpeech::default();
    let played = speech.played.clone();
    let volumes = source.volumes.clone();
    let mut lp = announcement_loop(source, speech, AT_START);

    lp.run_iteration();

    let volumes = volumes.lock().unwrap();
    assert_eq!(volumes.first(), Some(&60));
    assert_eq!(volumes.iter().min(), Some(&54));
    assert_eq!(volumes.last(), Some(&60));

    let (_, speech_volume) = played.lock().unwrap()[0];
    assert!((speech_volume - 0.5f32.powf(2.5)).abs() < 1e-6);
}

#[test]
fn test_low_device_volume_gives_silent_announcement() {
    let source = ScriptedSource::snapshots([playing("Joni Mitchell", "River", 5, 0)]);
    let speech = RecordingSpeech::default();
    let played = speech.played.clone();
    let volumes = source.volumes.clone();
    let mut lp = announcement_loop(source, speech, AT_START);

    lp.run_iteration();

    assert!(volumes.lock().unwrap().iter().all(|v| *v == 5));
    assert_eq!(played.lock().unwrap()[0].1, 0.0);
}

#[test]
fn test_end_mode_waits_then_announces() {
    let config = AnnouncementConfig {
        announce_at_track_start: false,
        ..AT_START
    };
    // 200 s tracks: 60 s left, 12 s left, 8 s left
    let source = ScriptedSource::snapshots([
        playing("Joni Mitchell", "River", 80, 140_000),
        playing("Joni Mitchell", "River", 80, 188_000),
        playing("Joni Mitchell", "River", 80, 192_000),
    ]);
    let speech = RecordingSpeech::default();
    let played = speech.played.clone();
    let mut lp = announcement_loop(source, speech, config);

    assert_eq!(lp.run_iteration(), Duration::from_secs(5));
    assert_eq!(lp.run_iteration(), Duration::from_secs(2));
    assert!(played.lock().unwrap().is_empty());
    assert_eq!(lp.session().previous_artist_key, None);

    assert_eq!(lp.run_iteration(), Duration::from_secs(1));
    assert_eq!(played.lock().unwrap().len(), 1);
}

#[test]
fn test_no_playback_reports_and_retries_later() {
    let bus = StatusBus::new();
    let rx = bus.subscribe();
    let mut lp = announcement_loop(
        ScriptedSource::new([Ok(None)]),
        RecordingSpeech::default(),
        AT_START,
    )
    .with_status_bus(bus);

    assert_eq!(lp.run_iteration(), Duration::from_secs(5));
    assert_eq!(rx.try_recv().unwrap(), Status::NoPlayback);
}

#[test]
fn test_paused_player_is_reported_but_not_announced() {
    let mut paused = playing("Joni Mitchell", "River", 80, 0);
    paused.is_playing = false;

    let bus = StatusBus::new();
    let rx = bus.subscribe();
    let speech = RecordingSpeech::default();
    let played = speech.played.clone();
    let mut lp = announcement_loop(ScriptedSource::snapshots([paused]), speech, AT_START)
        .with_status_bus(bus);

    assert_eq!(lp.run_iteration(), Duration::from_secs(1));
    assert!(played.lock().unwrap().is_empty());
    assert_eq!(
        rx.try_recv().unwrap(),
        Status::Listening {
            title: "River".to_string(),
            artist: "Joni Mitchell".to_string()
        }
    );
}

#[test]
fn test_episode_is_skipped_without_touching_state() {
    let episode = track("Podcast Host", "Episode 12", ItemKind::Episode);
    let snapshot = PlaybackSnapshot {
        is_playing: true,
        device_volume: 80,
        duration_ms: episode.duration_ms,
        track: Some(episode),
        progress_ms: 0,
    };
    let source = ScriptedSource::snapshots([snapshot]);
    let volumes = source.volumes.clone();
    let mut lp = announcement_loop(source, RecordingSpeech::default(), AT_START);

    assert_eq!(lp.run_iteration(), Duration::from_secs(5));
    assert!(volumes.lock().unwrap().is_empty());
    assert_eq!(lp.session().previous_artist_key, None);
}

#[test]
fn test_service_error_backs_off() {
    let bus = StatusBus::new();
    let rx = bus.subscribe();
    let source = ScriptedSource::new([
        Err(ServiceError::Transport("timeout".to_string())),
        Ok(Some(playing("Joni Mitchell", "River", 80, 0))),
    ]);
    let speech = RecordingSpeech::default();
    let played = speech.played.clone();
    let mut lp = announcement_loop(source, speech, AT_START).with_status_bus(bus);

    assert_eq!(lp.run_iteration(), Duration::from_secs(10));
    match rx.try_recv().unwrap() {
        Status::Error { kind, .. } => assert_eq!(kind, "ServiceError"),
        other => panic!("unexpected status {:?}", other),
    }

    // The loop carries on after the back-off
    assert_eq!(lp.run_iteration(), Duration::from_secs(1));
    assert_eq!(played.lock().unwrap().len(), 1);
}

#[test]
fn test_playback_failure_keeps_artist_pending() {
    let bus = StatusBus::new();
    let rx = bus.subscribe();
    let source = ScriptedSource::snapshots([
        playing("Joni Mitchell", "River", 100, 0),
        playing("Joni Mitchell", "River", 100, 2_000),
    ]);
    let volumes = source.volumes.clone();
    let speech = RecordingSpeech {
        failures: 1,
        ..RecordingSpeech::default()
    };
    let played = speech.played.clone();
    let mut lp = announcement_loop(source, speech, AT_START).with_status_bus(bus);

    assert_eq!(lp.run_iteration(), Duration::from_secs(10));
    assert_eq!(lp.session().previous_artist_key, None);
    // Fade-in never ran: the device stays at the reduced volume
    assert_eq!(volumes.lock().unwrap().last(), Some(&90));
    match rx.try_recv().unwrap() {
        Status::Error { kind, .. } => assert_eq!(kind, "PlaybackError"),
        other => panic!("unexpected status {:?}", other),
    }

    // Same artist is announced again on the next poll
    assert_eq!(lp.run_iteration(), Duration::from_secs(1));
    assert_eq!(played.lock().unwrap().len(), 1);
    assert_eq!(
        lp.session().previous_artist_key.as_deref(),
        Some("Joni Mitchell")
    );
}

#[test]
fn test_volume_failure_aborts_before_speech() {
    let mut source = ScriptedSource::snapshots([playing("Joni Mitchell", "River", 100, 0)]);
    source.fail_volume = true;
    let speech = RecordingSpeech::default();
    let played = speech.played.clone();
    let mut lp = announcement_loop(source, speech, AT_START);

    assert_eq!(lp.run_iteration(), Duration::from_secs(10));
    assert!(played.lock().unwrap().is_empty());
    assert_eq!(lp.session().previous_artist_key, None);
}

#[test]
fn test_random_selector_uses_both_phrasings() {
    let config = AnnouncementConfig {
        include_song_titles: true,
        include_album_titles: true,
        announce_at_track_start: true,
    };
    // Alternate artists so each poll is a change
    let snapshots = (0..200).map(|i| {
        let artist = if i % 2 == 0 { "Joni Mitchell" } else { "Nina Simone" };
        playing(artist, "River", 80, 0)
    });
    let speech = RecordingSpeech::default();
    let played = speech.played.clone();
    let mut lp = AnnouncementLoop::new(ScriptedSource::snapshots(snapshots), speech, config)
        .with_selector(RandomSelector)
        .with_pacer(Arc::new(NoPause::default()));

    for _ in 0..200 {
        lp.run_iteration();
    }

    let texts: HashSet<String> = played
        .lock()
        .unwrap()
        .iter()
        .filter(|(t, _)| t.starts_with("Joni Mitchell"))
        .map(|(t, _)| t.clone())
        .collect();
    assert!(texts.contains("Joni Mitchell, from the album Greatest Hits."));
    assert!(texts.contains("Joni Mitchell. River."));
    assert_eq!(texts.len(), 2);
}

#[test]
fn test_fade_pauses_between_steps() {
    let pacer = Arc::new(NoPause::default());
    let source = ScriptedSource::snapshots([playing("Joni Mitchell", "River", 100, 0)]);
    let mut lp = AnnouncementLoop::new(source, RecordingSpeech::default(), AT_START)
        .with_selector(FixedSelector(0))
        .with_pacer(pacer.clone());

    lp.run_iteration();

    // 8 pauses down, 8 up, none after the final set of each ramp
    let pauses = pacer.pauses.lock().unwrap();
    assert_eq!(pauses.len(), 2 * FADE_STEPS as usize);
    assert!(pauses.iter().all(|p| *p == FADE_DURATION / FADE_STEPS));
    assert_eq!(pauses[0], Duration::from_millis(25));
}

#[test]
fn test_ad_is_skipped_and_reported_as_no_playback() {
    let bus = StatusBus::new();
    let rx = bus.subscribe();
    let ad = PlaybackSnapshot {
        is_playing: true,
        device_volume: 80,
        duration_ms: 0,
        track: Some(heraldcore::Track::new(Vec::new(), None, None, 0, ItemKind::Ad)),
        progress_ms: 0,
    };
    let source = ScriptedSource::snapshots([ad]);
    let volumes = source.volumes.clone();
    let mut lp = announcement_loop(source, RecordingSpeech::default(), AT_START).with_status_bus(bus);

    assert_eq!(lp.run_iteration(), Duration::from_secs(5));
    assert_eq!(rx.try_recv().unwrap(), Status::NoPlayback);
    assert!(volumes.lock().unwrap().is_empty());
}
