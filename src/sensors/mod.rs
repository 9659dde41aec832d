//! Temperature sensor acquisition.
//!
//! A [`SensorProvider`] enumerates devices and their sensors, the
//! [`classify`] module reduces an enumeration to the hottest CPU and GPU
//! temperature, and the [`SensorPoller`] repeats that on a background task.

pub mod classify;
pub mod data;
pub mod poller;
pub mod provider;

pub use data::{format_celsius, Device, Sensor, SensorCategory, SensorKind, TemperatureReading};
pub use poller::SensorPoller;
pub use provider::{SensorProvider, SysinfoProvider};
