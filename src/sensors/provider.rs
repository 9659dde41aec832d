//! Sensor providers: the hardware backend the poller queries each cycle.

use crate::error::Result;
use crate::sensors::data::{Device, Sensor};
use std::collections::BTreeMap;
use sysinfo::Components;

/// Source of device and sensor enumerations.
///
/// `enumerate` may block (it usually touches sysfs or a vendor library), so
/// callers run it off the async scheduler.
pub trait SensorProvider: Send {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Refresh and list every device with its sensors.
    fn enumerate(&mut self) -> Result<Vec<Device>>;
}

/// hwmon driver names that report CPU package or core temperatures.
const CPU_DRIVERS: &[&str] = &["coretemp", "k10temp", "zenpower", "cpu_thermal", "x86_pkg_temp"];

/// hwmon driver names that report GPU temperatures.
const GPU_DRIVERS: &[&str] = &["amdgpu", "radeon", "nouveau", "nvidia"];

/// Sensor provider backed by `sysinfo` components.
pub struct SysinfoProvider {
    components: Components,
}

impl SysinfoProvider {
    /// Create a new provider with a freshly discovered component list.
    pub fn new() -> Self {
        Self {
            components: Components::new_with_refreshed_list(),
        }
    }
}

impl Default for SysinfoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorProvider for SysinfoProvider {
    fn name(&self) -> &str {
        "sysinfo"
    }

    fn enumerate(&mut self) -> Result<Vec<Device>> {
        if self.components.is_empty() {
            self.components.refresh_list();
        } else {
            self.components.refresh();
        }

        let labels = self
            .components
            .iter()
            .map(|component| (component.label().to_string(), component.temperature()));
        Ok(group_components(labels))
    }
}

/// Group `(label, celsius)` pairs into devices.
///
/// Component labels look like `"<chip> <sensor>"` (for example
/// `"coretemp Package id 0"`), so the first word names the device. Known CPU
/// and GPU drivers get a category prefix since their chip names carry no
/// "cpu"/"gpu" marker of their own.
pub fn group_components(components: impl IntoIterator<Item = (String, f32)>) -> Vec<Device> {
    let mut devices: BTreeMap<String, Vec<Sensor>> = BTreeMap::new();

    for (label, celsius) in components {
        let label = label.trim();
        let (chip, sensor) = match label.split_once(' ') {
            Some((chip, rest)) => (chip, rest.trim()),
            None => (label, label),
        };
        let value = if celsius.is_finite() {
            Some(celsius as f64)
        } else {
            None
        };
        devices
            .entry(device_name(chip))
            .or_default()
            .push(Sensor::temperature(sensor, value));
    }

    devices
        .into_iter()
        .map(|(name, sensors)| Device::new(name, sensors))
        .collect()
}

fn device_name(chip: &str) -> String {
    let lower = chip.to_lowercase();
    if CPU_DRIVERS.iter().any(|d| lower.starts_with(d)) {
        format!("CPU ({})", chip)
    } else if GPU_DRIVERS.iter().any(|d| lower.starts_with(d)) {
        format!("GPU ({})", chip)
    } else {
        chip.to_string()
    }
}
