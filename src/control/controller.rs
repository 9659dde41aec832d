//! Top-level mode state machine.

use crate::config::{ConfigStore, Mode, SettingKey, Settings};
use crate::control::handle::Command;
use crate::control::monitor::{ThresholdMonitor, Verdict};
use crate::control::sequencer::{ArmSource, SequenceStatus, SequencerEvent, ShutdownSequencer};
use crate::control::shutdown::ShutdownAction;
use crate::error::{GuardError, Result};
use crate::sensors::TemperatureReading;
use crate::timer::{self, CountdownTimer, Tick, TimerStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A countdown the user can start or cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Main shutdown countdown
    Shutdown,
    /// The confirmation before shutdown; can only be cancelled
    Confirmation,
    /// Delay before monitoring resumes
    CheckDelay,
}

impl TimerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerKind::Shutdown => "shutdown",
            TimerKind::Confirmation => "confirmation",
            TimerKind::CheckDelay => "check_delay",
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerKind {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shutdown" => Ok(TimerKind::Shutdown),
            "confirmation" => Ok(TimerKind::Confirmation),
            "check_delay" | "check" => Ok(TimerKind::CheckDelay),
            other => Err(GuardError::timer_input_error(format!("unknown timer '{}'", other))),
        }
    }
}

/// What caused a mode transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    User,
    CheckTimerElapsed,
    Startup,
}

/// Emitted once per mode transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeChange {
    pub from: Mode,
    pub to: Mode,
    pub cause: TransitionCause,
}

/// Everything the presentation layer shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub mode: Mode,
    pub monitoring_enabled: bool,
    pub reading: Option<TemperatureReading>,
    pub shutdown: SequenceStatus,
    pub check_delay: TimerStatus,
    pub settings: Settings,
}

/// Owns the shutdown sequencer and the check-delay countdown, and allows
/// only one mode to be active.
///
/// Every transition cancels both timer kinds, persists the new mode and
/// then auto-starts the timer belonging to the new mode. All methods run on
/// the controller task; other tasks talk to it through a
/// [`ControlHandle`](crate::control::ControlHandle).
pub struct ModeController {
    config: ConfigStore,
    sequencer: ShutdownSequencer,
    check_delay: CountdownTimer,
    monitor: ThresholdMonitor,
    mode: Mode,
    reading: Option<TemperatureReading>,
    status: watch::Sender<StatusSnapshot>,
    mode_changes: broadcast::Sender<ModeChange>,
}

impl ModeController {
    /// Create a controller in monitoring mode. Call [`restore`](Self::restore)
    /// to enter the persisted mode.
    pub fn new(
        config: ConfigStore,
        action: Arc<dyn ShutdownAction>,
        monitor: ThresholdMonitor,
    ) -> Self {
        let sequencer = ShutdownSequencer::new(action);
        let check_delay = CountdownTimer::new("check_delay");
        let snapshot = StatusSnapshot {
            mode: Mode::Monitoring,
            monitoring_enabled: monitor.is_enabled(),
            reading: None,
            shutdown: sequencer.status(),
            check_delay: check_delay.status(),
            settings: config.settings(),
        };
        let (status, _) = watch::channel(snapshot);
        let (mode_changes, _) = broadcast::channel(16);

        Self {
            config,
            sequencer,
            check_delay,
            monitor,
            mode: Mode::Monitoring,
            reading: None,
            status,
            mode_changes,
        }
    }

    /// Enter the mode saved in the configuration.
    pub fn restore(&mut self) {
        let mode = self.config.settings().active_mode;
        self.transition(mode, TransitionCause::Startup);
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// User-selected mode switch.
    pub fn switch_mode(&mut self, mode: Mode) {
        self.transition(mode, TransitionCause::User);
    }

    fn transition(&mut self, to: Mode, cause: TransitionCause) {
        let from = self.mode;

        self.sequencer.cancel();
        self.check_delay.cancel();
        self.mode = to;
        let settings = self.config.update(|s| s.active_mode = to);

        match to {
            Mode::ShutdownTimer if !self.sequencer.is_active() => {
                self.sequencer
                    .arm(settings.timer_shutdown_minutes, ArmSource::Manual);
            }
            Mode::CheckTimer if !self.check_delay.is_running() => {
                self.check_delay
                    .start(settings.timer_start_check_minutes as u64 * 60);
            }
            _ => {}
        }

        info!(%from, %to, ?cause, "Mode changed");
        let _ = self.mode_changes.send(ModeChange { from, to, cause });
        self.publish();
    }

    /// Parse and persist a user-edited setting.
    pub fn set_value(&mut self, key: SettingKey, raw: &str) -> Result<Settings> {
        let settings = self.config.set_value(key, raw)?;
        info!(%key, value = %settings.value_of(key), "Setting updated");
        self.publish();
        Ok(settings)
    }

    /// Start a countdown on user request.
    ///
    /// `entered` is the duration in minutes as typed; when given it is
    /// validated and persisted first. Returns `Ok(false)` when the timer is
    /// already running, in which case nothing is persisted.
    pub fn start_timer(&mut self, kind: TimerKind, entered: Option<&str>) -> Result<bool> {
        let started = match kind {
            TimerKind::Shutdown => {
                if self.sequencer.is_active() {
                    warn!("Shutdown timer already running");
                    return Ok(false);
                }
                let minutes = self.entered_minutes(SettingKey::TimerShutdownMinutes, entered)?;
                self.monitor.set_enabled(true);
                self.sequencer.arm(minutes, ArmSource::Manual)
            }
            TimerKind::CheckDelay => {
                if self.check_delay.is_running() {
                    warn!("Check timer already running");
                    return Ok(false);
                }
                let minutes = self.entered_minutes(SettingKey::TimerStartCheckMinutes, entered)?;
                self.check_delay.start(minutes as u64 * 60)
            }
            TimerKind::Confirmation => {
                return Err(GuardError::timer_input_error(
                    "the confirmation countdown starts on its own",
                ));
            }
        };

        self.publish();
        Ok(started)
    }

    fn entered_minutes(&mut self, key: SettingKey, entered: Option<&str>) -> Result<u32> {
        let settings = match entered {
            Some(raw) => self.config.set_value(key, raw)?,
            None => self.config.settings(),
        };
        Ok(match key {
            SettingKey::TimerStartCheckMinutes => settings.timer_start_check_minutes,
            _ => settings.timer_shutdown_minutes,
        })
    }

    /// Cancel a countdown. Returns whether anything was running.
    pub fn cancel_timer(&mut self, kind: TimerKind) -> bool {
        let auto_armed = self.sequencer.source() == Some(ArmSource::Auto);
        let remaining = match kind {
            TimerKind::Shutdown => self.sequencer.status().main.clock(),
            TimerKind::Confirmation => self.sequencer.status().confirmation.clock(),
            TimerKind::CheckDelay => self.check_delay.status().clock(),
        };
        let cancelled = match kind {
            TimerKind::Shutdown => self.sequencer.cancel(),
            TimerKind::Confirmation => self.sequencer.dismiss_confirmation(),
            TimerKind::CheckDelay => self.check_delay.cancel(),
        };

        if cancelled {
            info!(timer = %kind, %remaining, "Countdown cancelled");
        }
        if cancelled && auto_armed && kind != TimerKind::CheckDelay {
            self.monitor.note_cancelled(Instant::now());
        }
        self.publish();
        cancelled
    }

    /// Stop or resume threshold evaluation.
    pub fn set_monitoring(&mut self, enabled: bool) {
        if self.monitor.is_enabled() != enabled {
            info!(enabled, "Threshold monitoring toggled");
        }
        self.monitor.set_enabled(enabled);
        self.publish();
    }

    /// Take a new reading and auto-arm the shutdown if it qualifies.
    pub fn on_reading(&mut self, reading: TemperatureReading) -> Verdict {
        let verdict = self.monitor.evaluate(
            &reading,
            &self.config.settings(),
            self.sequencer.is_active(),
            Instant::now(),
        );
        self.reading = Some(reading);

        match verdict {
            Verdict::Arm { minutes } => {
                info!("Temperatures below targets, arming shutdown");
                self.sequencer.arm(minutes, ArmSource::Auto);
            }
            Verdict::Hold(reason) => debug!(?reason, "No auto-arm"),
        }

        self.publish();
        verdict
    }

    /// Advance every countdown by one second.
    pub fn tick(&mut self) {
        match self.sequencer.tick() {
            Some(SequencerEvent::ConfirmationStarted) => {
                info!("Waiting for confirmation before shutdown")
            }
            Some(SequencerEvent::ShutdownDispatched) => info!("Shutdown dispatched"),
            None => {}
        }

        if let Tick::Expired = self.check_delay.tick() {
            info!("Check timer elapsed, resuming monitoring");
            self.transition(Mode::Monitoring, TransitionCause::CheckTimerElapsed);
        }

        self.publish();
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            mode: self.mode,
            monitoring_enabled: self.monitor.is_enabled(),
            reading: self.reading.clone(),
            shutdown: self.sequencer.status(),
            check_delay: self.check_delay.status(),
            settings: self.config.settings(),
        }
    }

    fn publish(&self) {
        self.status.send_replace(self.status());
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.subscribe()
    }

    pub fn subscribe_mode_changes(&self) -> broadcast::Receiver<ModeChange> {
        self.mode_changes.subscribe()
    }

    /// Apply one command from a handle and send the reply.
    pub fn handle_command(&mut self, command: Command) {
        match command {
            Command::SwitchMode { mode, reply } => {
                self.switch_mode(mode);
                let _ = reply.send(self.status());
            }
            Command::SetValue { key, value, reply } => {
                let result = self.set_value(key, &value);
                if let Err(e) = &result {
                    warn!("Rejected value for {}: {}", key, e);
                }
                let _ = reply.send(result);
            }
            Command::StartTimer {
                kind,
                entered,
                reply,
            } => {
                let result = self.start_timer(kind, entered.as_deref());
                if let Err(e) = &result {
                    warn!("Could not start {} timer: {}", kind, e);
                }
                let _ = reply.send(result);
            }
            Command::CancelTimer { kind, reply } => {
                let _ = reply.send(self.cancel_timer(kind));
            }
            Command::SetMonitoring { enabled, reply } => {
                self.set_monitoring(enabled);
                let _ = reply.send(enabled);
            }
        }
    }

    /// Cancel every countdown before exit.
    pub fn teardown(&mut self) {
        self.sequencer.cancel();
        self.check_delay.cancel();
        self.publish();
        info!("Controller stopped");
    }

    /// Run the controller until `stop` is set or every handle is dropped.
    ///
    /// Ticks, readings and commands are handled one at a time on this task,
    /// so configuration writes and timer changes never race.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut readings: watch::Receiver<Option<TemperatureReading>>,
        mut stop: watch::Receiver<bool>,
    ) {
        let mut ticker = timer::second_ticker();
        let mut readings_open = true;
        info!(mode = %self.mode, "Controller started");

        loop {
            if *stop.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => self.tick(),
                changed = readings.changed(), if readings_open => match changed {
                    Ok(()) => {
                        let reading = readings.borrow_and_update().clone();
                        if let Some(reading) = reading {
                            self.on_reading(reading);
                        }
                    }
                    Err(_) => {
                        warn!("Sensor poller went away");
                        readings_open = false;
                    }
                },
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.teardown();
        self.sequencer.wait_for_dispatch().await;
    }
}
