use std::io::{self, Write};
use std::thread;

use anyhow::{Context, Result};
use heraldconfig::Config;
use heraldcore::{AnnouncementConfig, AnnouncementLoop, Announcer, Status, Voice, artist_key};
use heraldspotify::{SpotifyApi, SpotifyConfigExt, SpotifySession, extract_code};
use heraldvoice::AudioEngine;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, Copy)]
pub struct RunOptions {
    pub songs: bool,
    pub albums: bool,
    pub at_start: bool,
    pub save: bool,
}

/// Options from the config file, with command-line flags switching them on.
fn announcement_config(config: &Config, options: RunOptions) -> Result<AnnouncementConfig> {
    let announcement = AnnouncementConfig {
        include_song_titles: options.songs || config.get_include_song_titles()?,
        include_album_titles: options.albums || config.get_include_album_titles()?,
        announce_at_track_start: options.at_start || config.get_announce_at_start()?,
    };

    if options.save {
        config.set_include_song_titles(announcement.include_song_titles)?;
        config.set_include_album_titles(announcement.include_album_titles)?;
        config.set_announce_at_start(announcement.announce_at_track_start)?;
        info!("Announcer options saved");
    }

    Ok(announcement)
}

fn voice(config: &Config) -> Result<Voice> {
    Ok(Voice {
        language: config.get_voice_language()?,
        tld: config.get_voice_tld()?,
    })
}

/// Runs the announcer until Ctrl-C.
pub async fn run(config: &Config, options: RunOptions) -> Result<()> {
    let announcement = announcement_config(config, options)?;
    let voice = voice(config)?;

    let session = SpotifySession::open(config).context("Cannot open the Spotify session")?;
    let engine = match AudioEngine::open() {
        Ok(engine) => engine,
        Err(e) => {
            session.close();
            return Err(e).context("Cannot open the audio output");
        }
    };

    let mut announcer = Announcer::new();
    let statuses = announcer.subscribe();
    let printer = thread::spawn(move || {
        for status in statuses.iter() {
            println!("{}", status);
        }
    });

    let announcement_loop = AnnouncementLoop::new(session, engine, announcement).with_voice(voice);
    if let Err(refused) = announcer.start(announcement_loop) {
        let (error, announcement_loop) = refused.into_inner();
        let (session, engine) = announcement_loop.into_parts();
        engine.close();
        session.close();
        return Err(error.into());
    }

    info!("Press Ctrl+C to stop...");
    tokio::signal::ctrl_c()
        .await
        .context("Cannot listen for Ctrl-C")?;

    // Stop blocks until the current iteration is over
    let parts = tokio::task::spawn_blocking(move || announcer.stop()).await?;

    match parts {
        Some((session, engine)) => {
            engine.close();
            session.close();
        }
        None => warn!("Announcer worker did not shut down cleanly"),
    }

    // Every status sender is gone once the announcer is dropped
    let _ = printer.join();
    Ok(())
}

/// Interactive authorization-code flow; the tokens end up in the config.
pub fn authorize(
    config: &Config,
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
) -> Result<()> {
    if let Some(id) = client_id {
        config.set_spotify_client_id(&id)?;
    }
    if let Some(secret) = client_secret {
        config.set_spotify_client_secret(&secret)?;
    }
    if let Some(uri) = redirect_uri {
        config.set_spotify_redirect_uri(&uri)?;
    }

    let credentials = config.get_spotify_credentials()?;
    let mut api = SpotifyApi::new();

    println!("Open this URL in a browser and allow access:\n");
    println!("  {}\n", api.authorize_url(&credentials)?);
    print!("Paste the URL you were redirected to: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;

    let code = extract_code(&line)?;
    let auth = api.exchange_code(&credentials, &code)?;
    config.set_spotify_auth_info(&auth)?;

    println!("Spotify authorization saved in {}", config.directory().display());
    Ok(())
}

/// Reads the player once and prints what it finds.
pub fn status(config: &Config) -> Result<()> {
    let mut session = SpotifySession::open(config).context("Cannot open the Spotify session")?;
    let state = session.playback()?;
    session.close();

    let Some(state) = state else {
        println!("{}", Status::NoPlayback);
        return Ok(());
    };

    let snapshot = state.to_snapshot();
    match &snapshot.track {
        Some(track) => {
            println!(
                "{}",
                Status::Listening {
                    title: track.title.clone(),
                    artist: artist_key(track),
                }
            );
            println!("Album: {}", track.album_name);
            println!(
                "Position: {}s / {}s ({})",
                snapshot.progress_ms / 1000,
                snapshot.duration_ms / 1000,
                if snapshot.is_playing { "playing" } else { "paused" }
            );
        }
        None => println!("{}", Status::NoPlayback),
    }

    if let Some(device) = &state.device {
        println!("Device: {} at {}%", device.name, snapshot.device_volume);
    }
    Ok(())
}
