use heraldconfig::Config;
use serde_yaml::Value;
use std::fs;

#[test]
fn load_config_writes_embedded_defaults() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = Config::load_config(dir.path().to_str().unwrap())?;

    assert!(dir.path().join("config.yaml").exists());
    assert!(!config.get_include_song_titles()?);
    assert!(!config.get_include_album_titles()?);
    assert!(!config.get_announce_at_start()?);
    assert_eq!(config.get_voice_language()?, "en");
    assert_eq!(config.get_voice_tld()?, "co.uk");

    Ok(())
}

#[test]
fn load_config_merges_user_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(
        dir.path().join("config.yaml"),
        "Announcer:\n  Announce_At_Start: true\nvoice:\n  tld: com\n",
    )?;

    let config = Config::load_config(dir.path().to_str().unwrap())?;

    assert!(config.get_announce_at_start()?);
    assert_eq!(config.get_voice_tld()?, "com");
    // Valeur absente du fichier : le défaut embarqué reste en place
    assert_eq!(config.get_voice_language()?, "en");

    Ok(())
}

#[test]
fn setters_persist_across_reloads() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().to_str().unwrap().to_string();

    {
        let config = Config::load_config(&path)?;
        config.set_include_album_titles(true)?;
        config.set_u64(&["accounts", "spotify", "token_expires_at"], 1_700_000_000)?;
    }

    let reloaded = Config::load_config(&path)?;
    assert!(reloaded.get_include_album_titles()?);
    assert_eq!(
        reloaded.get_u64(&["accounts", "spotify", "token_expires_at"]),
        Some(1_700_000_000)
    );
    assert_eq!(
        reloaded.get_value(&["accounts", "spotify", "redirect_uri"])?,
        Value::String("http://localhost:8888/callback".to_string())
    );

    Ok(())
}

#[test]
fn empty_config_file_keeps_defaults() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("config.yaml"), "")?;

    let config = Config::load_config(dir.path().to_str().unwrap())?;
    assert_eq!(config.get_log_min_level()?, "INFO");
    assert!(config.get_log_enable_console()?);

    Ok(())
}
