//! Loading, repairing and persisting the settings record.

use crate::config::settings::{SettingKey, Settings};
use crate::error::{GuardError, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// File name of the persisted record.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Owns the persisted settings record and publishes the in-memory copy.
///
/// All mutations go through the store so that the published value, the
/// in-memory value and the file stay in step. Readers on other tasks hold a
/// [`watch::Receiver`] from [`ConfigStore::subscribe`].
pub struct ConfigStore {
    path: PathBuf,
    settings: watch::Sender<Settings>,
}

impl ConfigStore {
    /// Path of `config.json` beside the running executable.
    pub fn default_path() -> Result<PathBuf> {
        let exe = std::env::current_exe()?;
        let dir = exe
            .parent()
            .ok_or_else(|| GuardError::config_error("Executable has no parent directory"))?;
        Ok(dir.join(CONFIG_FILE_NAME))
    }

    /// Open the store at `path`, loading (and repairing) the record.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let (settings, _) = watch::channel(Settings::default());
        let store = Self {
            path: path.into(),
            settings,
        };
        store.load();
        store
    }

    /// Location of the persisted record.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current in-memory settings.
    pub fn settings(&self) -> Settings {
        self.settings.borrow().clone()
    }

    /// Subscribe to settings changes.
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.settings.subscribe()
    }

    /// Load the record from disk.
    ///
    /// A missing record is created with defaults. Invalid keys are replaced by
    /// their defaults and unknown keys are dropped; either repair rewrites the
    /// file. A record that cannot be parsed at all is discarded and reset.
    pub fn load(&self) -> Settings {
        let settings = match self.read_record() {
            Ok(None) => {
                info!("No configuration at {:?}, writing defaults", self.path);
                let defaults = Settings::default();
                self.persist(&defaults);
                defaults
            }
            Ok(Some(record)) => {
                let repair = Settings::repair(&record);
                if repair.is_dirty() {
                    warn!(
                        defaulted = ?repair.defaulted,
                        removed = ?repair.removed,
                        "Repaired configuration at {:?}",
                        self.path
                    );
                    self.persist(&repair.settings);
                }
                repair.settings
            }
            Err(e) => {
                warn!("Discarding configuration at {:?}: {}", self.path, e);
                let defaults = Settings::default();
                self.persist(&defaults);
                defaults
            }
        };

        self.settings.send_replace(settings.clone());
        settings
    }

    fn read_record(&self) -> Result<Option<Map<String, Value>>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(record) => Ok(Some(record)),
            other => Err(GuardError::config_error(format!(
                "expected an object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Atomically overwrite the persisted record with `settings`.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let tmp = self.temp_path();
        fs::write(&tmp, encode(settings)?)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        debug!("Saved configuration to {:?}", self.path);
        Ok(())
    }

    /// Save, logging rather than returning a failure.
    fn persist(&self, settings: &Settings) {
        if let Err(e) = self.save(settings) {
            warn!("Failed to save configuration to {:?}: {}", self.path, e);
        }
    }

    /// Apply `change` to the settings, publish and persist the result.
    pub fn update(&self, change: impl FnOnce(&mut Settings)) -> Settings {
        let mut next = self.settings();
        change(&mut next);
        if next != *self.settings.borrow() {
            self.settings.send_replace(next.clone());
            self.persist(&next);
        }
        next
    }

    /// Parse and store a user-entered value.
    ///
    /// On a parse or range failure the previous value is kept and a
    /// [`GuardError::TimerInput`] is returned.
    pub fn set_value(&self, key: SettingKey, raw: &str) -> Result<Settings> {
        let next = self.settings().with_value(key, raw)?;
        Ok(self.update(|settings| *settings = next))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

/// Encode settings as human-editable JSON with four-space indentation.
pub fn encode(settings: &Settings) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    settings.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
