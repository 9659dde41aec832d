//! Data structures for sensor enumeration and temperature readings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of quantity a sensor measures. Only temperatures are consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Temperature,
    Load,
    Fan,
    Power,
    Voltage,
    Clock,
    Other,
}

/// A single sensor on a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    /// What the sensor measures
    pub kind: SensorKind,
    /// Sensor label (e.g., "Core Max", "edge")
    pub name: String,
    /// Latest value, `None` if the sensor did not report one
    pub value: Option<f64>,
}

impl Sensor {
    /// Create a temperature sensor.
    pub fn temperature(name: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            kind: SensorKind::Temperature,
            name: name.into(),
            value,
        }
    }
}

/// A hardware device exposing sensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Device name (e.g., "CPU Package", "Radeon RX 6600")
    pub name: String,
    /// Sensors on this device
    pub sensors: Vec<Sensor>,
}

impl Device {
    pub fn new(name: impl Into<String>, sensors: Vec<Sensor>) -> Self {
        Self {
            name: name.into(),
            sensors,
        }
    }
}

/// Category a temperature sensor is counted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorCategory {
    Cpu,
    Gpu,
}

impl fmt::Display for SensorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorCategory::Cpu => f.write_str("CPU"),
            SensorCategory::Gpu => f.write_str("GPU"),
        }
    }
}

/// Hottest CPU and GPU temperatures observed in one poll cycle.
///
/// `None` means no sensor of that category reported a value, which is not
/// the same as a reading of 0 °C.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    /// Hottest CPU sensor in Celsius
    pub cpu: Option<f64>,
    /// Hottest GPU sensor in Celsius
    pub gpu: Option<f64>,
    /// When the reading was taken
    pub observed_at: DateTime<Utc>,
}

impl TemperatureReading {
    /// Create a reading stamped with the current time.
    pub fn new(cpu: Option<f64>, gpu: Option<f64>) -> Self {
        Self {
            cpu,
            gpu,
            observed_at: Utc::now(),
        }
    }

    /// Temperature for `category`.
    pub fn get(&self, category: SensorCategory) -> Option<f64> {
        match category {
            SensorCategory::Cpu => self.cpu,
            SensorCategory::Gpu => self.gpu,
        }
    }

    /// Whether both categories reported a value.
    pub fn is_complete(&self) -> bool {
        self.cpu.is_some() && self.gpu.is_some()
    }
}

/// Render an optional temperature for display.
pub fn format_celsius(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}°C", v),
        None => "--".to_string(),
    }
}
