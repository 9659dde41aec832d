//! The persisted settings record and its validation rules.

use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Upper bound for every minutes-valued setting (one week).
pub const MAX_MINUTES: u32 = 7 * 24 * 60;

/// Upper bound for the sampling interval (one day).
pub const MAX_CHECK_INTERVAL_SECONDS: u32 = 24 * 60 * 60;

/// Top-level operating mode. Exactly one is active at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Mode {
    /// Temperature monitoring with threshold-triggered auto-arm
    #[default]
    #[serde(rename = "monitor")]
    Monitoring,
    /// Manual delayed shutdown
    #[serde(rename = "timer_shutdown")]
    ShutdownTimer,
    /// Delayed start of monitoring
    #[serde(rename = "timer_check")]
    CheckTimer,
}

impl Mode {
    /// Name used in the persisted record.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Monitoring => "monitor",
            Mode::ShutdownTimer => "timer_shutdown",
            Mode::CheckTimer => "timer_check",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monitor" | "monitoring" => Ok(Mode::Monitoring),
            "timer_shutdown" | "shutdown_timer" => Ok(Mode::ShutdownTimer),
            "timer_check" | "check_timer" => Ok(Mode::CheckTimer),
            other => Err(GuardError::timer_input_error(format!("unknown mode '{}'", other))),
        }
    }
}

/// A user-editable numeric setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    TargetCpuTemp,
    TargetGpuTemp,
    ShutdownDelayMinutes,
    CheckIntervalSeconds,
    TimerShutdownMinutes,
    TimerStartCheckMinutes,
}

impl SettingKey {
    pub const ALL: [SettingKey; 6] = [
        SettingKey::TargetCpuTemp,
        SettingKey::TargetGpuTemp,
        SettingKey::ShutdownDelayMinutes,
        SettingKey::CheckIntervalSeconds,
        SettingKey::TimerShutdownMinutes,
        SettingKey::TimerStartCheckMinutes,
    ];

    /// Key name in the persisted record.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::TargetCpuTemp => "target_cpu_temp",
            SettingKey::TargetGpuTemp => "target_gpu_temp",
            SettingKey::ShutdownDelayMinutes => "shutdown_delay_minutes",
            SettingKey::CheckIntervalSeconds => "check_interval_seconds",
            SettingKey::TimerShutdownMinutes => "timer_shutdown_minutes",
            SettingKey::TimerStartCheckMinutes => "timer_start_check_minutes",
        }
    }

    fn is_temperature(&self) -> bool {
        matches!(self, SettingKey::TargetCpuTemp | SettingKey::TargetGpuTemp)
    }

    fn integer_range(&self) -> (u32, u32) {
        match self {
            SettingKey::CheckIntervalSeconds => (1, MAX_CHECK_INTERVAL_SECONDS),
            _ => (1, MAX_MINUTES),
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        SettingKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| GuardError::timer_input_error(format!("unknown setting '{}'", s)))
    }
}

/// The complete persisted configuration.
///
/// Field order is the on-disk key order; it must stay stable so that a
/// repaired record is byte-identical on every subsequent save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// CPU temperature below which shutdown may be auto-armed (°C)
    pub target_cpu_temp: f64,
    /// GPU temperature below which shutdown may be auto-armed (°C)
    pub target_gpu_temp: f64,
    /// Length of an auto-armed shutdown countdown
    pub shutdown_delay_minutes: u32,
    /// Sensor sampling period
    pub check_interval_seconds: u32,
    /// Length of a manually started shutdown countdown
    pub timer_shutdown_minutes: u32,
    /// Delay before monitoring resumes in check-timer mode
    pub timer_start_check_minutes: u32,
    /// Mode restored at startup
    pub active_mode: Mode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_cpu_temp: 65.0,
            target_gpu_temp: 60.0,
            shutdown_delay_minutes: 14,
            check_interval_seconds: 4,
            timer_shutdown_minutes: 10,
            timer_start_check_minutes: 5,
            active_mode: Mode::Monitoring,
        }
    }
}

/// Outcome of rebuilding settings from a raw persisted record.
#[derive(Debug, Clone, PartialEq)]
pub struct Repair {
    pub settings: Settings,
    /// Keys that were missing or invalid and fell back to their default
    pub defaulted: Vec<String>,
    /// Keys that are not part of the schema and were dropped
    pub removed: Vec<String>,
}

impl Repair {
    /// Whether the record on disk differs from `settings` and must be rewritten.
    pub fn is_dirty(&self) -> bool {
        !self.defaulted.is_empty() || !self.removed.is_empty()
    }
}

const ACTIVE_MODE_KEY: &str = "active_mode";

impl Settings {
    /// Build settings from a raw record, defaulting every key that is absent,
    /// mistyped or out of range and dropping every key outside the schema.
    pub fn repair(record: &Map<String, Value>) -> Repair {
        let mut settings = Settings::default();
        let mut defaulted = Vec::new();

        for key in SettingKey::ALL {
            let accepted = record
                .get(key.as_str())
                .map(|value| settings.accept_value(key, value))
                .unwrap_or(false);
            if !accepted {
                defaulted.push(key.as_str().to_string());
            }
        }

        match record
            .get(ACTIVE_MODE_KEY)
            .and_then(|v| serde_json::from_value::<Mode>(v.clone()).ok())
        {
            Some(mode) => settings.active_mode = mode,
            None => defaulted.push(ACTIVE_MODE_KEY.to_string()),
        }

        let removed = record
            .keys()
            .filter(|k| {
                k.as_str() != ACTIVE_MODE_KEY && SettingKey::from_str(k).is_err()
            })
            .cloned()
            .collect();

        Repair {
            settings,
            defaulted,
            removed,
        }
    }

    /// Store a JSON value under `key` if it has the right type and range.
    fn accept_value(&mut self, key: SettingKey, value: &Value) -> bool {
        if key.is_temperature() {
            match value.as_f64() {
                Some(v) if valid_temperature(v) => {
                    self.set_temperature(key, v);
                    true
                }
                _ => false,
            }
        } else {
            let (min, max) = key.integer_range();
            match value.as_u64() {
                Some(v) if v >= min as u64 && v <= max as u64 => {
                    self.set_integer(key, v as u32);
                    true
                }
                _ => false,
            }
        }
    }

    /// Parse a user-entered value for `key` and return the updated settings.
    ///
    /// Nothing is modified on failure.
    pub fn with_value(&self, key: SettingKey, raw: &str) -> Result<Settings> {
        let raw = raw.trim();
        let mut next = self.clone();

        if key.is_temperature() {
            let value: f64 = raw.parse().map_err(|_| {
                GuardError::timer_input_error(format!("{}: '{}' is not a number", key, raw))
            })?;
            if !valid_temperature(value) {
                return Err(GuardError::timer_input_error(format!(
                    "{}: {} must be a positive temperature",
                    key, value
                )));
            }
            next.set_temperature(key, value);
        } else {
            let value: u32 = raw.parse().map_err(|_| {
                GuardError::timer_input_error(format!("{}: '{}' is not a whole number", key, raw))
            })?;
            let (min, max) = key.integer_range();
            if value < min || value > max {
                return Err(GuardError::timer_input_error(format!(
                    "{}: {} is outside {}..={}",
                    key, value, min, max
                )));
            }
            next.set_integer(key, value);
        }

        Ok(next)
    }

    /// Current value of `key` rendered as text.
    pub fn value_of(&self, key: SettingKey) -> String {
        match key {
            SettingKey::TargetCpuTemp => self.target_cpu_temp.to_string(),
            SettingKey::TargetGpuTemp => self.target_gpu_temp.to_string(),
            SettingKey::ShutdownDelayMinutes => self.shutdown_delay_minutes.to_string(),
            SettingKey::CheckIntervalSeconds => self.check_interval_seconds.to_string(),
            SettingKey::TimerShutdownMinutes => self.timer_shutdown_minutes.to_string(),
            SettingKey::TimerStartCheckMinutes => self.timer_start_check_minutes.to_string(),
        }
    }

    fn set_temperature(&mut self, key: SettingKey, value: f64) {
        match key {
            SettingKey::TargetCpuTemp => self.target_cpu_temp = value,
            SettingKey::TargetGpuTemp => self.target_gpu_temp = value,
            _ => {}
        }
    }

    fn set_integer(&mut self, key: SettingKey, value: u32) {
        match key {
            SettingKey::ShutdownDelayMinutes => self.shutdown_delay_minutes = value,
            SettingKey::CheckIntervalSeconds => self.check_interval_seconds = value,
            SettingKey::TimerShutdownMinutes => self.timer_shutdown_minutes = value,
            SettingKey::TimerStartCheckMinutes => self.timer_start_check_minutes = value,
            _ => {}
        }
    }
}

fn valid_temperature(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_default_record_is_clean() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        let repair = Settings::repair(&record(value));
        assert!(!repair.is_dirty());
        assert_eq!(repair.settings, Settings::default());
    }

    #[test]
    fn test_mistyped_key_falls_back_to_default() {
        let mut value = serde_json::to_value(Settings::default()).unwrap();
        value["target_cpu_temp"] = json!(70.5);
        value["check_interval_seconds"] = json!("fast");
        value["shutdown_delay_minutes"] = json!(3.5);

        let repair = Settings::repair(&record(value));
        assert_eq!(repair.settings.target_cpu_temp, 70.5);
        assert_eq!(repair.settings.check_interval_seconds, 4);
        assert_eq!(repair.settings.shutdown_delay_minutes, 14);
        assert!(repair.defaulted.contains(&"check_interval_seconds".to_string()));
        assert!(repair.defaulted.contains(&"shutdown_delay_minutes".to_string()));
    }

    #[test]
    fn test_integer_temperature_is_accepted() {
        let mut value = serde_json::to_value(Settings::default()).unwrap();
        value["target_gpu_temp"] = json!(55);
        let repair = Settings::repair(&record(value));
        assert_eq!(repair.settings.target_gpu_temp, 55.0);
        assert!(!repair.is_dirty());
    }

    #[test]
    fn test_out_of_range_values_are_defaulted() {
        let mut value = serde_json::to_value(Settings::default()).unwrap();
        value["target_cpu_temp"] = json!(-4.0);
        value["check_interval_seconds"] = json!(0);
        value["timer_shutdown_minutes"] = json!(MAX_MINUTES + 1);

        let repair = Settings::repair(&record(value));
        assert_eq!(repair.settings, Settings::default());
        assert_eq!(repair.defaulted.len(), 3);
    }

    #[test]
    fn test_unknown_mode_is_defaulted() {
        let mut value = serde_json::to_value(Settings::default()).unwrap();
        value["active_mode"] = json!("turbo");
        let repair = Settings::repair(&record(value));
        assert_eq!(repair.settings.active_mode, Mode::Monitoring);
        assert_eq!(repair.defaulted, vec!["active_mode".to_string()]);
    }

    #[test]
    fn test_unknown_keys_are_removed() {
        let mut value = serde_json::to_value(Settings::default()).unwrap();
        value["foo"] = json!(1);
        let repair = Settings::repair(&record(value));
        assert_eq!(repair.removed, vec!["foo".to_string()]);
        assert!(repair.is_dirty());
    }

    #[test]
    fn test_with_value_parses_and_validates() {
        let settings = Settings::default();

        let next = settings.with_value(SettingKey::TargetCpuTemp, " 58.5 ").unwrap();
        assert_eq!(next.target_cpu_temp, 58.5);

        let next = settings.with_value(SettingKey::TimerShutdownMinutes, "25").unwrap();
        assert_eq!(next.timer_shutdown_minutes, 25);

        assert!(settings.with_value(SettingKey::TimerShutdownMinutes, "ten").is_err());
        assert!(settings.with_value(SettingKey::TimerShutdownMinutes, "0").is_err());
        assert!(settings.with_value(SettingKey::CheckIntervalSeconds, "-1").is_err());
        assert!(settings.with_value(SettingKey::TargetGpuTemp, "NaN").is_err());
        assert!(settings
            .with_value(SettingKey::TargetGpuTemp, "0")
            .unwrap_err()
            .is_input_error());
    }

    #[test]
    fn test_mode_names() {
        assert_eq!("monitor".parse::<Mode>().unwrap(), Mode::Monitoring);
        assert_eq!("shutdown_timer".parse::<Mode>().unwrap(), Mode::ShutdownTimer);
        assert_eq!("timer_check".parse::<Mode>().unwrap(), Mode::CheckTimer);
        assert!("sleep".parse::<Mode>().is_err());
        assert_eq!(serde_json::to_string(&Mode::CheckTimer).unwrap(), "\"timer_check\"");
    }

    #[test]
    fn test_setting_key_names() {
        for key in SettingKey::ALL {
            assert_eq!(key.as_str().parse::<SettingKey>().unwrap(), key);
            let serialized = serde_json::to_string(&key).unwrap();
            assert_eq!(serialized, format!("\"{}\"", key.as_str()));
        }
    }
}
