//! Configuration store (~/.config/tickreel/config.toml)
//!
//! A flat map of dotted keys (`tasfile.separator`) to string values, stored
//! as one TOML table per key prefix:
//!
//! ```toml
//! [tasfile]
//! directory = "saves/tasfiles"
//! separator = ":"
//!
//! [ticksync]
//! enabled = true
//! ```
//!
//! Every known key has a default, so reads never fail for a missing entry.
//! Only the typed accessors can fail, when a stored value does not parse.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A known setting and its default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigKey {
    pub name: &'static str,
    pub default: &'static str,
}

impl ConfigKey {
    pub const fn new(name: &'static str, default: &'static str) -> Self {
        Self { name, default }
    }

    /// Look up a known key by name.
    pub fn lookup(name: &str) -> Option<ConfigKey> {
        KNOWN_KEYS.iter().copied().find(|key| key.name == name)
    }
}

/// Directory relative TASfile names are resolved against
pub const TASFILE_DIRECTORY: ConfigKey = ConfigKey::new("tasfile.directory", "saves/tasfiles");
/// Header key/value separator for new files
pub const TASFILE_SEPARATOR: ConfigKey = ConfigKey::new("tasfile.separator", ":");
/// Input encoding for new files
pub const TASFILE_FLAVOR: ConfigKey = ConfigKey::new("tasfile.flavor", "v1");
/// Gate host ticks on peer acknowledgements
pub const TICKSYNC_ENABLED: ConfigKey = ConfigKey::new("ticksync.enabled", "true");
/// Broadcast playback state changes to peers
pub const PLAYBACK_NOTIFY_STATE: ConfigKey = ConfigKey::new("playback.notify_state", "true");

pub const KNOWN_KEYS: [ConfigKey; 5] = [
    TASFILE_DIRECTORY,
    TASFILE_SEPARATOR,
    TASFILE_FLAVOR,
    TICKSYNC_ENABLED,
    PLAYBACK_NOTIFY_STATE,
];

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    Write(#[from] toml::ser::Error),
    #[error("config key {key} has value {value:?}, expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

/// Value as written in the TOML file. Scalars are kept as text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Table(BTreeMap<String, RawValue>),
}

impl RawValue {
    /// Typed form of a stored string, so `true` is written unquoted.
    ///
    /// Only text that reads back identically is typed; `007` stays a string.
    fn from_text(text: &str) -> RawValue {
        match (text.parse::<bool>(), text.parse::<i64>()) {
            (Ok(b), _) if b.to_string() == text => RawValue::Bool(b),
            (_, Ok(i)) if i.to_string() == text => RawValue::Int(i),
            _ => RawValue::Text(text.to_string()),
        }
    }
}

fn flatten(prefix: &str, table: BTreeMap<String, RawValue>, out: &mut BTreeMap<String, String>) {
    for (key, value) in table {
        let name = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            RawValue::Bool(b) => {
                out.insert(name, b.to_string());
            }
            RawValue::Int(i) => {
                out.insert(name, i.to_string());
            }
            RawValue::Float(f) => {
                out.insert(name, f.to_string());
            }
            RawValue::Text(s) => {
                out.insert(name, s);
            }
            RawValue::Table(inner) => flatten(&name, inner, out),
        }
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\tickreel\config`
/// On macOS: `~/Library/Application Support/io.tickreel.tickreel`
/// On Linux: `~/.config/tickreel`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "tickreel", "tickreel")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Default location of the config file.
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Key/value settings backed by a TOML file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl ConfigStore {
    /// A store holding only defaults. Nothing is read until [`Self::load`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            path: path.into(),
            values: BTreeMap::new(),
        };
        store.fill_defaults();
        store
    }

    /// Open and load the store at [`default_config_path`].
    pub fn open_default() -> Result<Self, ConfigError> {
        let path = default_config_path().ok_or_else(|| ConfigError::Io {
            path: PathBuf::from(CONFIG_FILE),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no home directory to place the config in",
            ),
        })?;
        let mut store = Self::new(path);
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file. A missing file is created with defaults.
    ///
    /// Known keys absent from the file keep their defaults; unknown keys are
    /// kept as they are.
    pub fn load(&mut self) -> Result<(), ConfigError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No config file, writing defaults");
                self.values.clear();
                self.fill_defaults();
                return self.save();
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let table: BTreeMap<String, RawValue> =
            toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: self.path.clone(),
                source,
            })?;

        self.values.clear();
        flatten("", table, &mut self.values);
        self.fill_defaults();
        tracing::debug!(path = %self.path.display(), keys = self.values.len(), "Loaded config");
        Ok(())
    }

    /// Write every value back, grouped by key prefix.
    pub fn save(&self) -> Result<(), ConfigError> {
        let mut root: BTreeMap<String, RawValue> = BTreeMap::new();
        for (name, value) in &self.values {
            let value = RawValue::from_text(value);
            match name.split_once('.') {
                Some((section, key)) => {
                    let entry = root
                        .entry(section.to_string())
                        .or_insert_with(|| RawValue::Table(BTreeMap::new()));
                    match entry {
                        RawValue::Table(table) => {
                            table.insert(key.to_string(), value);
                        }
                        // A top-level key shadows the section of the same name
                        _ => tracing::warn!(key = %name, "Config key collides with a plain value, skipping"),
                    }
                }
                None => {
                    root.insert(name.clone(), value);
                }
            }
        }

        let content = toml::to_string_pretty(&root)?;
        let io_err = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(io_err)?;
        }
        std::fs::write(&self.path, content).map_err(io_err)
    }

    /// Current value of a known key.
    pub fn get(&self, key: &ConfigKey) -> &str {
        self.values
            .get(key.name)
            .map(String::as_str)
            .unwrap_or(key.default)
    }

    /// Value of any key, known or not.
    pub fn get_raw(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn get_int(&self, key: &ConfigKey) -> Result<i64, ConfigError> {
        let value = self.get(key);
        value
            .trim()
            .parse()
            .map_err(|_| invalid_value(key, value, "an integer"))
    }

    pub fn get_bool(&self, key: &ConfigKey) -> Result<bool, ConfigError> {
        let value = self.get(key);
        value
            .trim()
            .parse()
            .map_err(|_| invalid_value(key, value, "true or false"))
    }

    /// A value that must be exactly one character, such as a separator.
    pub fn get_char(&self, key: &ConfigKey) -> Result<char, ConfigError> {
        let value = self.get(key);
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(invalid_value(key, value, "a single character")),
        }
    }

    /// Set a value in memory. Call [`Self::save`] to persist it.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_string(), value.into());
    }

    /// Restore the default of a known key. Returns false for unknown keys.
    pub fn reset(&mut self, name: &str) -> bool {
        match ConfigKey::lookup(name) {
            Some(key) => {
                self.values.insert(key.name.to_string(), key.default.to_string());
                true
            }
            None => false,
        }
    }

    /// Remove a value. Known keys fall back to their default on the next read.
    pub fn delete(&mut self, name: &str) -> bool {
        self.values.remove(name).is_some()
    }

    /// Every stored key and value, sorted by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn fill_defaults(&mut self) {
        for key in KNOWN_KEYS {
            self.values
                .entry(key.name.to_string())
                .or_insert_with(|| key.default.to_string());
        }
    }
}

fn invalid_value(key: &ConfigKey, value: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.name.to_string(),
        value: value.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join("nested").join(CONFIG_FILE))
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.get(&TASFILE_DIRECTORY), "saves/tasfiles");
        assert_eq!(store.get_char(&TASFILE_SEPARATOR).unwrap(), ':');
        assert!(store.get_bool(&TICKSYNC_ENABLED).unwrap());
    }

    #[test]
    fn test_load_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.load().unwrap();
        assert!(store.path().exists());

        let written = std::fs::read_to_string(store.path()).unwrap();
        assert!(written.contains("[tasfile]"));
        assert!(written.contains("enabled = true"));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.set("tasfile.separator", "=");
        store.set("ticksync.enabled", "false");
        store.set("custom.retries", "3");
        store.save().unwrap();

        let mut reloaded = store_in(&dir);
        reloaded.load().unwrap();
        assert_eq!(reloaded.get_char(&TASFILE_SEPARATOR).unwrap(), '=');
        assert!(!reloaded.get_bool(&TICKSYNC_ENABLED).unwrap());
        assert_eq!(reloaded.get_raw("custom.retries"), Some("3"));
        assert_eq!(reloaded.get(&TASFILE_FLAVOR), "v1");
    }

    #[test]
    fn test_numeric_looking_text_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.set("tasfile.directory", "007");
        store.set("custom.tag", "+1");
        store.set("custom.count", "42");
        store.save().unwrap();

        let written = std::fs::read_to_string(store.path()).unwrap();
        assert!(written.contains("count = 42"));

        let mut reloaded = store_in(&dir);
        reloaded.load().unwrap();
        assert_eq!(reloaded.get(&TASFILE_DIRECTORY), "007");
        assert_eq!(reloaded.get_raw("custom.tag"), Some("+1"));
        assert_eq!(reloaded.get_raw("custom.count"), Some("42"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[playback]\nnotify_state = false\n").unwrap();

        let mut store = ConfigStore::new(&path);
        store.load().unwrap();
        assert!(!store.get_bool(&PLAYBACK_NOTIFY_STATE).unwrap());
        assert_eq!(store.get(&TASFILE_DIRECTORY), "saves/tasfiles");
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[tasfile\nseparator = ").unwrap();

        let mut store = ConfigStore::new(&path);
        assert!(matches!(store.load(), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_typed_getters_reject_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.set("ticksync.enabled", "sometimes");
        store.set("tasfile.separator", "::");

        assert!(matches!(
            store.get_bool(&TICKSYNC_ENABLED),
            Err(ConfigError::InvalidValue { expected: "true or false", .. })
        ));
        assert!(store.get_char(&TASFILE_SEPARATOR).is_err());
        assert!(store.get_int(&TASFILE_FLAVOR).is_err());
    }

    #[test]
    fn test_reset_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.set("tasfile.flavor", "v2");
        assert!(store.reset("tasfile.flavor"));
        assert_eq!(store.get(&TASFILE_FLAVOR), "v1");
        assert!(!store.reset("no.such.key"));

        store.set("tasfile.directory", "elsewhere");
        assert!(store.delete("tasfile.directory"));
        assert_eq!(store.get(&TASFILE_DIRECTORY), "saves/tasfiles");
        assert!(!store.delete("tasfile.directory"));
    }
}
