//! Level-triggered auto-arm evaluation.

use crate::config::Settings;
use crate::sensors::TemperatureReading;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Outcome of evaluating one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Conditions hold: arm a shutdown countdown of this many minutes
    Arm { minutes: u32 },
    /// Conditions do not hold
    Hold(HoldReason),
}

/// Why a reading did not arm the shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldReason {
    Disabled,
    MissingCpu,
    MissingGpu,
    CpuAboveTarget,
    GpuAboveTarget,
    CountdownActive,
    Snoozed,
}

/// Decides, reading by reading, whether the machine is cool enough to arm
/// an automatic shutdown.
///
/// Evaluation keeps no memory of earlier readings and ignores the active
/// mode: cancelling any countdown while the machine stays cold re-arms it
/// on the next cycle.
/// A non-zero snooze suppresses that re-arm for a fixed period after the
/// cancel.
#[derive(Debug, Clone)]
pub struct ThresholdMonitor {
    enabled: bool,
    snooze: Duration,
    snoozed_until: Option<Instant>,
}

impl Default for ThresholdMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ThresholdMonitor {
    pub fn new() -> Self {
        Self::with_snooze(Duration::ZERO)
    }

    pub fn with_snooze(snooze: Duration) -> Self {
        Self {
            enabled: true,
            snooze,
            snoozed_until: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn snooze(&self) -> Duration {
        self.snooze
    }

    /// Record that the user cancelled an auto-armed countdown at `now`.
    pub fn note_cancelled(&mut self, now: Instant) {
        if !self.snooze.is_zero() {
            self.snoozed_until = Some(now + self.snooze);
            debug!(seconds = self.snooze.as_secs(), "Auto-arm snoozed");
        }
    }

    /// Evaluate a reading against the configured thresholds.
    pub fn evaluate(
        &self,
        reading: &TemperatureReading,
        settings: &Settings,
        countdown_active: bool,
        now: Instant,
    ) -> Verdict {
        if !self.enabled {
            return Verdict::Hold(HoldReason::Disabled);
        }

        let cpu = match reading.cpu {
            Some(cpu) => cpu,
            None => return Verdict::Hold(HoldReason::MissingCpu),
        };
        let gpu = match reading.gpu {
            Some(gpu) => gpu,
            None => return Verdict::Hold(HoldReason::MissingGpu),
        };

        if !(cpu < settings.target_cpu_temp) {
            return Verdict::Hold(HoldReason::CpuAboveTarget);
        }
        if !(gpu < settings.target_gpu_temp) {
            return Verdict::Hold(HoldReason::GpuAboveTarget);
        }
        if countdown_active {
            return Verdict::Hold(HoldReason::CountdownActive);
        }
        if matches!(self.snoozed_until, Some(until) if now < until) {
            return Verdict::Hold(HoldReason::Snoozed);
        }

        Verdict::Arm {
            minutes: settings.shutdown_delay_minutes,
        }
    }
}
