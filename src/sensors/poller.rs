//! Background sampling loop.

use crate::config::Settings;
use crate::error::{GuardError, Result};
use crate::sensors::classify;
use crate::sensors::data::TemperatureReading;
use crate::sensors::provider::SensorProvider;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Periodically queries a [`SensorProvider`] and publishes the latest
/// [`TemperatureReading`].
///
/// The period is re-read from the settings channel after every cycle, so an
/// edit takes effect on the next sleep rather than the one in progress.
pub struct SensorPoller {
    provider: Arc<Mutex<Box<dyn SensorProvider>>>,
    provider_name: String,
    settings: watch::Receiver<Settings>,
    readings: watch::Sender<Option<TemperatureReading>>,
}

impl SensorPoller {
    pub fn new(provider: impl SensorProvider + 'static, settings: watch::Receiver<Settings>) -> Self {
        let provider_name = provider.name().to_string();
        let (readings, _) = watch::channel(None);
        Self {
            provider: Arc::new(Mutex::new(Box::new(provider))),
            provider_name,
            settings,
            readings,
        }
    }

    /// Subscribe to published readings. `None` until the first good cycle.
    pub fn readings(&self) -> watch::Receiver<Option<TemperatureReading>> {
        self.readings.subscribe()
    }

    /// Latest published reading.
    pub fn latest(&self) -> Option<TemperatureReading> {
        self.readings.borrow().clone()
    }

    /// Query the provider once, on a blocking thread.
    pub async fn poll_once(&self) -> Result<TemperatureReading> {
        let provider = Arc::clone(&self.provider);
        let devices = tokio::task::spawn_blocking(move || {
            let mut provider = provider.lock().unwrap_or_else(PoisonError::into_inner);
            provider.enumerate()
        })
        .await
        .map_err(|e| GuardError::sensor_error(format!("sensor task failed: {}", e)))??;

        Ok(classify::aggregate(&devices))
    }

    /// Run one cycle: poll and publish. On failure the previous reading is
    /// kept and the error is logged. Returns whether a reading was published.
    pub async fn run_cycle(&self) -> bool {
        match self.poll_once().await {
            Ok(reading) => {
                debug!(cpu = ?reading.cpu, gpu = ?reading.gpu, "Published temperature reading");
                self.readings.send_replace(Some(reading));
                true
            }
            Err(e) => {
                warn!("Skipping poll cycle ({}): {}", self.provider_name, e);
                false
            }
        }
    }

    fn period(&self) -> Duration {
        let seconds = self.settings.borrow().check_interval_seconds.max(1);
        Duration::from_secs(seconds as u64)
    }

    /// Spawn the polling loop. It runs until `stop` turns `true` or its
    /// sender is dropped.
    pub fn spawn(self, mut stop: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(provider = %self.provider_name, "Sensor poller started");

            loop {
                if *stop.borrow() {
                    break;
                }

                self.run_cycle().await;

                let period = self.period();
                tokio::select! {
                    _ = tokio::time::sleep(period) => {}
                    changed = stop.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }

            info!(provider = %self.provider_name, "Sensor poller stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::data::{Device, Sensor};
    use std::collections::VecDeque;

    /// Replays scripted enumerations; an empty script yields an error.
    struct ScriptedProvider {
        script: VecDeque<Result<Vec<Device>>>,
    }

    impl SensorProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn enumerate(&mut self) -> Result<Vec<Device>> {
            self.script
                .pop_front()
                .unwrap_or_else(|| Err(GuardError::sensor_error("script exhausted")))
        }
    }

    fn cpu_device(value: f64) -> Vec<Device> {
        vec![Device::new("CPU Package", vec![Sensor::temperature("Core Max", Some(value))])]
    }

    fn poller(script: Vec<Result<Vec<Device>>>) -> SensorPoller {
        let (_tx, settings) = watch::channel(Settings::default());
        SensorPoller::new(
            ScriptedProvider {
                script: script.into(),
            },
            settings,
        )
    }

    #[tokio::test]
    async fn test_failed_cycle_keeps_previous_reading() {
        let poller = poller(vec![
            Ok(cpu_device(50.0)),
            Err(GuardError::sensor_error("device vanished")),
        ]);

        assert!(poller.run_cycle().await);
        assert!(!poller.run_cycle().await);
        assert_eq!(poller.latest().unwrap().cpu, Some(50.0));
    }

    /// Panics on the first enumeration, then reports a CPU reading.
    struct PanicOnceProvider {
        panicked: bool,
    }

    impl SensorProvider for PanicOnceProvider {
        fn name(&self) -> &str {
            "panic-once"
        }

        fn enumerate(&mut self) -> Result<Vec<Device>> {
            if !self.panicked {
                self.panicked = true;
                panic!("driver fault");
            }
            Ok(cpu_device(47.0))
        }
    }

    #[tokio::test]
    async fn test_recovers_after_provider_panic() {
        let (_tx, settings) = watch::channel(Settings::default());
        let poller = SensorPoller::new(PanicOnceProvider { panicked: false }, settings);

        assert!(!poller.run_cycle().await);
        assert!(poller.run_cycle().await);
        assert_eq!(poller.latest().unwrap().cpu, Some(47.0));
    }

    #[tokio::test]
    async fn test_spawned_loop_publishes_and_stops() {
        let poller = poller(vec![Ok(cpu_device(42.0))]);
        let mut readings = poller.readings();
        let (stop_tx, stop_rx) = watch::channel(false);

        let task = poller.spawn(stop_rx);
        readings.changed().await.unwrap();
        assert_eq!(readings.borrow().as_ref().unwrap().cpu, Some(42.0));

        stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("poller should stop promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn test_period_follows_settings() {
        let (tx, settings) = watch::channel(Settings::default());
        let poller = SensorPoller::new(
            ScriptedProvider {
                script: VecDeque::new(),
            },
            settings,
        );
        assert_eq!(poller.period(), Duration::from_secs(4));

        tx.send_modify(|s| s.check_interval_seconds = 30);
        assert_eq!(poller.period(), Duration::from_secs(30));
    }
}
