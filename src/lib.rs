//! # Thermal Guard
//!
//! Watches CPU and GPU temperatures and shuts the machine down once it has
//! been idle and cool for a while. It also offers two manual countdowns: a
//! delayed shutdown, and a delay before monitoring starts.
//!
//! ## Features
//!
//! - **Temperature polling**: hottest CPU and GPU sensor on a background task
//! - **Auto-arm**: a cancellable shutdown countdown once both readings are
//!   below their targets, followed by a short confirmation countdown
//! - **Modes**: monitoring, shutdown timer and check timer, one at a time
//! - **Persisted settings**: a human-editable JSON file beside the binary
//! - **Control API**: HTTP endpoints and a WebSocket status stream
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use thermal_guard::{
//!     ConfigStore, ControlHandle, ModeController, SensorPoller, SysinfoProvider,
//!     SystemShutdown, ThresholdMonitor,
//! };
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ConfigStore::open(ConfigStore::default_path()?);
//!     let (stop_tx, stop_rx) = watch::channel(false);
//!
//!     let poller = SensorPoller::new(SysinfoProvider::new(), store.subscribe());
//!     let readings = poller.readings();
//!     let poller_task = poller.spawn(stop_rx.clone());
//!
//!     let mut controller =
//!         ModeController::new(store, Arc::new(SystemShutdown), ThresholdMonitor::new());
//!     controller.restore();
//!     let (handle, commands) = ControlHandle::channel(controller.subscribe());
//!     let controller_task = tokio::spawn(controller.run(commands, readings, stop_rx));
//!
//!     println!("{:?}", handle.status().mode);
//!     stop_tx.send(true)?;
//!     controller_task.await?;
//!     poller_task.await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod control;
pub mod error;
pub mod sensors;
pub mod timer;
pub mod web;

// Re-export public API
pub use config::{ConfigStore, Mode, SettingKey, Settings};
pub use control::{
    ArmSource, ControlHandle, LogOnlyShutdown, ModeChange, ModeController, ShutdownAction,
    ShutdownSequencer, StatusSnapshot, SystemShutdown, ThresholdMonitor, TimerKind,
    TransitionCause, Verdict,
};
pub use error::{GuardError, Result};
pub use sensors::{
    Device, Sensor, SensorCategory, SensorKind, SensorPoller, SensorProvider, SysinfoProvider,
    TemperatureReading,
};
pub use timer::{CountdownTimer, Tick, TimerState, TimerStatus};
pub use web::{start_web_server, WebConfig};

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 8080;

/// The default web server bind address
pub const DEFAULT_HOST: &str = "127.0.0.1";
