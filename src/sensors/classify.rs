//! Sorting temperature sensors into CPU and GPU categories.

use crate::sensors::data::{Device, SensorCategory, SensorKind, TemperatureReading};

const CPU_MARKERS: &[&str] = &["cpu"];
const GPU_MARKERS: &[&str] = &["gpu", "vga"];

/// Classify a sensor by case-insensitive substring match on the device name
/// or the sensor name. CPU markers win when both match.
pub fn classify(device_name: &str, sensor_name: &str) -> Option<SensorCategory> {
    let device = device_name.to_lowercase();
    let sensor = sensor_name.to_lowercase();
    let hit = |markers: &[&str]| {
        markers
            .iter()
            .any(|m| device.contains(m) || sensor.contains(m))
    };

    if hit(CPU_MARKERS) {
        Some(SensorCategory::Cpu)
    } else if hit(GPU_MARKERS) {
        Some(SensorCategory::Gpu)
    } else {
        None
    }
}

/// Reduce an enumeration to the hottest CPU and GPU temperature.
///
/// Non-temperature sensors, sensors without a value and non-finite values
/// are ignored. A category with no matching sensor stays `None`.
pub fn aggregate(devices: &[Device]) -> TemperatureReading {
    let mut cpu: Option<f64> = None;
    let mut gpu: Option<f64> = None;

    for device in devices {
        for sensor in &device.sensors {
            if sensor.kind != SensorKind::Temperature {
                continue;
            }
            let Some(value) = sensor.value.filter(|v| v.is_finite()) else {
                continue;
            };
            let slot = match classify(&device.name, &sensor.name) {
                Some(SensorCategory::Cpu) => &mut cpu,
                Some(SensorCategory::Gpu) => &mut gpu,
                None => continue,
            };
            *slot = Some(slot.map_or(value, |current| current.max(value)));
        }
    }

    TemperatureReading::new(cpu, gpu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::data::Sensor;

    #[test]
    fn test_sensor_name_match() {
        assert_eq!(classify("Graphics", "GPU Core"), Some(SensorCategory::Gpu));
    }

    #[test]
    fn test_device_name_match() {
        assert_eq!(classify("CPU Package", "Core Max"), Some(SensorCategory::Cpu));
        assert_eq!(classify("Standard VGA Adapter", "Hot Spot"), Some(SensorCategory::Gpu));
    }

    #[test]
    fn test_unrelated_sensor() {
        assert_eq!(classify("Samsung SSD 980", "Composite"), None);
        assert_eq!(classify("Motherboard", "Temperature #1"), None);
    }

    #[test]
    fn test_cpu_wins_over_gpu() {
        assert_eq!(classify("CPU with iGPU", "Package"), Some(SensorCategory::Cpu));
    }

    #[test]
    fn test_hottest_sensor_dominates() {
        let devices = vec![Device::new(
            "CPU Package",
            vec![
                Sensor::temperature("Core #1", Some(60.0)),
                Sensor::temperature("Core #2", Some(72.5)),
                Sensor::temperature("Core #3", Some(55.0)),
            ],
        )];

        let reading = aggregate(&devices);
        assert_eq!(reading.cpu, Some(72.5));
        assert_eq!(reading.gpu, None);
    }

    #[test]
    fn test_absent_is_not_zero() {
        let devices = vec![Device::new(
            "Graphics",
            vec![Sensor::temperature("GPU Core", Some(0.0))],
        )];

        let reading = aggregate(&devices);
        assert_eq!(reading.gpu, Some(0.0));
        assert_eq!(reading.cpu, None);
        assert!(!reading.is_complete());
    }

    #[test]
    fn test_ignores_non_temperature_and_missing_values() {
        let devices = vec![Device::new(
            "CPU Package",
            vec![
                Sensor {
                    kind: SensorKind::Load,
                    name: "CPU Total".to_string(),
                    value: Some(99.0),
                },
                Sensor::temperature("Core Max", None),
                Sensor::temperature("Core Avg", Some(f64::NAN)),
                Sensor::temperature("Package", Some(48.0)),
            ],
        )];

        assert_eq!(aggregate(&devices).cpu, Some(48.0));
    }

    #[test]
    fn test_empty_enumeration() {
        let reading = aggregate(&[]);
        assert_eq!(reading.cpu, None);
        assert_eq!(reading.gpu, None);
    }
}
