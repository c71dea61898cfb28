//! # Herald Configuration Module
//!
//! Configuration lives in `config.yaml` inside the Herald configuration
//! directory. On load, the file is merged over a default document compiled
//! into the binary, keys are lower-cased, `HERALD_CONFIG__*` environment
//! variables are applied on top, and the result is written back so the file
//! always shows every available option.
//!
//! ## Usage
//!
//! ```no_run
//! use heraldconfig::Config;
//!
//! let config = Config::load_config("")?;
//!
//! let at_start = config.get_announce_at_start()?;
//! config.set_include_song_titles(true)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result, anyhow};
use dirs::home_dir;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::{debug, info};

// Module de chiffrement des secrets
pub mod encryption;

// Document par défaut intégré au binaire
const DEFAULT_CONFIG: &str = include_str!("herald.yaml");

const ENV_CONFIG_DIR: &str = "HERALD_CONFIG";
const ENV_PREFIX: &str = "HERALD_CONFIG__";
const CONFIG_DIR_NAME: &str = ".herald";
const CONFIG_FILE_NAME: &str = "config.yaml";

const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;
const DEFAULT_VOICE_LANGUAGE: &str = "en";
const DEFAULT_VOICE_TLD: &str = "co.uk";

/// Generates a getter falling back to `$default` and a persisting setter for
/// a boolean option.
macro_rules! bool_setting {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            Ok(match self.get_value($path) {
                Ok(Value::Bool(b)) => b,
                _ => $default,
            })
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Same as `bool_setting!` for strings; an empty string reads as unset.
macro_rules! string_setting {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<String> {
            Ok(match self.get_value($path) {
                Ok(Value::String(s)) if !s.is_empty() => s,
                _ => $default.to_string(),
            })
        }

        pub fn $setter(&self, value: &str) -> Result<()> {
            self.set_value($path, Value::String(value.to_string()))
        }
    };
}

/// Configuration of one Herald installation.
///
/// Every setter writes the whole document back to disk. Clones are
/// independent snapshots sharing the same file.
#[derive(Debug)]
pub struct Config {
    dir: PathBuf,
    file: PathBuf,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        let data = self.data.lock().unwrap().clone();
        Self {
            dir: self.dir.clone(),
            file: self.file.clone(),
            data: Mutex::new(data),
        }
    }
}

/// Picks the configuration directory.
///
/// Order: `explicit` when not empty, `$HERALD_CONFIG`, an existing `./.herald`,
/// an existing `~/.herald`, and finally `./.herald`.
fn locate_dir(explicit: &str) -> PathBuf {
    if !explicit.is_empty() {
        return PathBuf::from(explicit);
    }

    if let Some(from_env) = env::var_os(ENV_CONFIG_DIR) {
        let from_env = PathBuf::from(from_env);
        info!(env_var = ENV_CONFIG_DIR, path = %from_env.display(), "Config directory from environment");
        return from_env;
    }

    let local = PathBuf::from(CONFIG_DIR_NAME);
    let in_home = home_dir().map(|home| home.join(CONFIG_DIR_NAME));

    [Some(local.clone()), in_home]
        .into_iter()
        .flatten()
        .find(|candidate| candidate.is_dir())
        .unwrap_or(local)
}

/// Creates `dir` if needed and checks that it can be listed and written.
fn ensure_usable(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create config directory {}", dir.display()))?;

    if !dir.is_dir() {
        return Err(anyhow!("{} is not a directory", dir.display()));
    }

    let probe = dir.join(".write_test");
    fs::write(&probe, b"herald")
        .with_context(|| format!("Config directory {} is not writable", dir.display()))?;
    fs::remove_file(&probe)?;

    fs::read_dir(dir)
        .with_context(|| format!("Config directory {} is not readable", dir.display()))?;
    Ok(())
}

impl Config {
    /// Resolves and validates the configuration directory (see [`Config::load_config`]).
    pub fn config_dir(directory: &str) -> Result<PathBuf> {
        let dir = locate_dir(directory);
        ensure_usable(&dir)?;
        Ok(dir)
    }

    /// Loads the configuration.
    ///
    /// `directory` may be empty, in which case the directory is searched in
    /// this order: `$HERALD_CONFIG`, `./.herald`, `~/.herald`. It is created
    /// when missing.
    pub fn load_config(directory: &str) -> Result<Self> {
        let dir = Self::config_dir(directory)?;
        let file = dir.join(CONFIG_FILE_NAME);
        info!(config_dir = %dir.display(), "Using config directory");

        let mut document: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        match fs::read(&file) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => {
                info!(config_file = %file.display(), "Config file is empty, using embedded defaults");
            }
            Ok(bytes) => {
                info!(config_file = %file.display(), "Loaded config file");
                let user: Value = serde_yaml::from_slice(&bytes)
                    .with_context(|| format!("Invalid YAML in {}", file.display()))?;
                merge_yaml(&mut document, &lowercase_keys(user));
            }
            Err(_) => {
                info!(config_file = %file.display(), "Config file not found, using embedded defaults");
            }
        }

        let mut document = lowercase_keys(document);
        apply_env_overrides(&mut document, env::vars());

        let config = Config {
            dir,
            file,
            data: Mutex::new(document),
        };
        config.save()?;
        Ok(config)
    }

    /// Directory holding `config.yaml`.
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    pub fn save(&self) -> Result<()> {
        let yaml = {
            let data = self.data.lock().unwrap();
            serde_yaml::to_string(&*data)?
        };
        fs::write(&self.file, yaml)
            .with_context(|| format!("Cannot write {}", self.file.display()))?;
        debug!(config_file = %self.file.display(), "Config saved");
        Ok(())
    }

    /// Stores `value` at `path` (e.g. `&["voice", "tld"]`), creating the
    /// intermediate mappings, then saves.
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut data = self.data.lock().unwrap();
            insert_at(&mut data, path, value)?;
        }
        self.save()
    }

    /// Value at `path`; an error names the first missing prefix.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data.lock().unwrap();
        lookup(&data, path).cloned()
    }

    /// Reads an unsigned number at `path`, `None` when absent or not numeric
    pub fn get_u64(&self, path: &[&str]) -> Option<u64> {
        match self.get_value(path) {
            Ok(Value::Number(n)) => n.as_u64().or_else(|| n.as_i64().map(|v| v.max(0) as u64)),
            _ => None,
        }
    }

    pub fn set_u64(&self, path: &[&str], value: u64) -> Result<()> {
        self.set_value(path, Value::Number(Number::from(value)))
    }

    bool_setting!(
        get_include_song_titles,
        set_include_song_titles,
        &["announcer", "include_song_titles"],
        false
    );

    bool_setting!(
        get_include_album_titles,
        set_include_album_titles,
        &["announcer", "include_album_titles"],
        false
    );

    bool_setting!(
        get_announce_at_start,
        set_announce_at_start,
        &["announcer", "announce_at_start"],
        false
    );

    string_setting!(
        get_voice_language,
        set_voice_language,
        &["voice", "language"],
        DEFAULT_VOICE_LANGUAGE
    );

    string_setting!(
        get_voice_tld,
        set_voice_tld,
        &["voice", "tld"],
        DEFAULT_VOICE_TLD
    );

    bool_setting!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    string_setting!(
        get_log_min_level,
        set_log_min_level,
        &["host", "logger", "min_level"],
        DEFAULT_LOG_MIN_LEVEL
    );
}

fn key(name: &str) -> Value {
    Value::String(name.to_lowercase())
}

fn lookup<'a>(root: &'a Value, path: &[&str]) -> Result<&'a Value> {
    let mut node = root;
    for (depth, name) in path.iter().enumerate() {
        let Value::Mapping(map) = node else {
            return Err(anyhow!("Path {} is not a mapping", path[..depth].join(".")));
        };
        node = map
            .get(&key(name))
            .ok_or_else(|| anyhow!("Path {} does not exist", path[..=depth].join(".")))?;
    }
    Ok(node)
}

fn insert_at(root: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut node = root;
    for (depth, name) in parents.iter().enumerate() {
        let Value::Mapping(map) = node else {
            return Err(anyhow!("Path {} is not a mapping", path[..depth].join(".")));
        };
        node = map
            .entry(key(name))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }

    match node {
        Value::Mapping(map) => {
            map.insert(key(last), value);
            Ok(())
        }
        _ => Err(anyhow!("Path {} is not a mapping", parents.join("."))),
    }
}

/// `HERALD_CONFIG__VOICE__TLD=com` sets `voice.tld`. Values are parsed as
/// YAML so `true` or `3` keep their type.
fn apply_env_overrides<I>(document: &mut Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (name, raw) in vars {
        let Some(stripped) = name.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path: Vec<&str> = stripped.split("__").collect();
        let value = serde_yaml::from_str::<Value>(&raw).unwrap_or(Value::String(raw.clone()));
        if let Err(e) = insert_at(document, &path, value) {
            debug!(variable = %name, "Ignoring config override: {}", e);
        }
    }
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (k, lowercase_keys(v))
                })
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

/// Merges `external` into `default`: mappings are merged key by key, any
/// other external value replaces the default one, and a null external value
/// changes nothing.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (_, Value::Null) => {}
        (Value::Mapping(defaults), Value::Mapping(overrides)) => {
            for (k, v) in overrides {
                match defaults.get_mut(k) {
                    Some(existing) => merge_yaml(existing, v),
                    None => {
                        defaults.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (slot, replacement) => *slot = replacement.clone(),
    }
}
