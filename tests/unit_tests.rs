use serde_json::json;
use std::fs;
use tempfile::TempDir;
use thermal_guard::{
    config::store::encode,
    sensors::classify::{aggregate, classify},
    ConfigStore, CountdownTimer, Device, GuardError, Mode, Sensor, SensorCategory, SensorKind,
    SettingKey, Settings, Tick, TimerState, WebConfig,
};

fn store_in(dir: &TempDir) -> ConfigStore {
    ConfigStore::open(dir.path().join("config.json"))
}

/// First run writes the defaults to disk
#[test]
fn test_first_run_writes_defaults() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    assert_eq!(store.settings(), Settings::default());
    let on_disk = fs::read(store.path()).unwrap();
    assert_eq!(on_disk, encode(&Settings::default()).unwrap());
}

/// Loading twice yields byte-identical files after the first repair
#[test]
fn test_load_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{"target_cpu_temp": 70, "active_mode": "timer_check", "foo": 1}"#,
    )
    .unwrap();

    let store = ConfigStore::open(&path);
    let first = fs::read(&path).unwrap();
    store.load();
    let second = fs::read(&path).unwrap();

    assert_eq!(first, second);
    assert_eq!(store.settings().target_cpu_temp, 70.0);
    assert_eq!(store.settings().active_mode, Mode::CheckTimer);
}

#[test]
fn test_unknown_key_is_removed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    let mut record = serde_json::to_value(Settings::default()).unwrap();
    record["foo"] = json!("bar");
    fs::write(&path, record.to_string()).unwrap();

    ConfigStore::open(&path);

    let reloaded: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert!(reloaded.get("foo").is_none());
    assert_eq!(reloaded.as_object().unwrap().len(), 7);
}

#[test]
fn test_missing_key_is_restored() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    let mut record = serde_json::to_value(Settings {
        target_gpu_temp: 55.5,
        ..Settings::default()
    })
    .unwrap();
    record.as_object_mut().unwrap().remove("check_interval_seconds");
    fs::write(&path, record.to_string()).unwrap();

    let store = ConfigStore::open(&path);

    assert_eq!(store.settings().check_interval_seconds, 4);
    assert_eq!(store.settings().target_gpu_temp, 55.5);
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"check_interval_seconds\": 4"));
}

#[test]
fn test_mistyped_value_falls_back_to_default() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{"shutdown_delay_minutes": "soon", "timer_shutdown_minutes": -3, "target_cpu_temp": 0}"#,
    )
    .unwrap();

    let settings = ConfigStore::open(&path).settings();
    assert_eq!(settings, Settings::default());
}

#[test]
fn test_corrupt_record_resets_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{ not json").unwrap();

    let store = ConfigStore::open(&path);
    assert_eq!(store.settings(), Settings::default());
    assert_eq!(fs::read(&path).unwrap(), encode(&Settings::default()).unwrap());
}

#[test]
fn test_rejected_edit_keeps_previous_value() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let err = store.set_value(SettingKey::CheckIntervalSeconds, "0").unwrap_err();
    assert!(matches!(err, GuardError::TimerInput(_)));
    assert!(store.set_value(SettingKey::TargetCpuTemp, "warm").is_err());

    assert_eq!(store.settings(), Settings::default());
    assert_eq!(store.load(), Settings::default());
}

#[test]
fn test_accepted_edit_is_persisted() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    store.set_value(SettingKey::TargetGpuTemp, " 57.5 ").unwrap();
    assert_eq!(store_in(&dir).settings().target_gpu_temp, 57.5);
}

#[test]
fn test_classification_by_device_or_sensor_name() {
    assert_eq!(classify("Graphics", "GPU Core"), Some(SensorCategory::Gpu));
    assert_eq!(classify("CPU Package", "Core Max"), Some(SensorCategory::Cpu));
    assert_eq!(classify("Standard VGA", "temp1"), Some(SensorCategory::Gpu));
    assert_eq!(classify("Motherboard", "Ambient"), None);
}

#[test]
fn test_hottest_sensor_wins() {
    let devices = vec![
        Device::new(
            "CPU Package",
            vec![
                Sensor::temperature("Core 0", Some(60.0)),
                Sensor::temperature("Core 1", Some(72.5)),
                Sensor::temperature("Core 2", Some(55.0)),
                Sensor {
                    kind: SensorKind::Load,
                    name: "Total".to_string(),
                    value: Some(99.0),
                },
            ],
        ),
        Device::new("Graphics", vec![Sensor::temperature("GPU Core", Some(48.0))]),
    ];

    let reading = aggregate(&devices);
    assert_eq!(reading.cpu, Some(72.5));
    assert_eq!(reading.gpu, Some(48.0));
}

#[test]
fn test_missing_category_is_absent_not_zero() {
    let devices = vec![Device::new("CPU Package", vec![Sensor::temperature("Core Max", Some(0.0))])];
    let reading = aggregate(&devices);
    assert_eq!(reading.cpu, Some(0.0));
    assert_eq!(reading.gpu, None);
    assert!(!reading.is_complete());
}

#[test]
fn test_countdown_lifecycle() {
    let mut timer = CountdownTimer::new("unit");
    assert_eq!(timer.state(), TimerState::Idle);
    assert!(timer.start(2));
    assert_eq!(timer.tick(), Tick::Running(1));
    assert_eq!(timer.tick(), Tick::Expired);
    assert_eq!(timer.state(), TimerState::Expired);
    assert!(timer.start(1));
    assert!(timer.cancel());
    assert_eq!(timer.remaining_seconds(), 0);
}

#[test]
fn test_web_config_builder() {
    let config = WebConfig::new("0.0.0.0", 3000);
    assert_eq!(config.bind_address(), "0.0.0.0:3000");
    assert!(!config.cors_enabled());
    assert!(config
        .with_cors_origins(["http://dashboard.lan"])
        .allows_origin("http://dashboard.lan", None));
}
