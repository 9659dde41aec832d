//! Persisted configuration.
//!
//! The record is a flat JSON object with a fixed set of keys. Loading never
//! fails: invalid keys fall back to defaults, unknown keys are dropped, and an
//! unreadable record is replaced wholesale.

pub mod settings;
pub mod store;

pub use settings::{Mode, Repair, SettingKey, Settings};
pub use store::{ConfigStore, CONFIG_FILE_NAME};
