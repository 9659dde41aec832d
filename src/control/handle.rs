//! Cloneable handle the presentation layer uses to drive the controller.

use crate::config::{Mode, SettingKey, Settings};
use crate::control::controller::{StatusSnapshot, TimerKind};
use crate::error::Result;
use tokio::sync::{mpsc, oneshot, watch};

const COMMAND_BUFFER: usize = 32;

/// A request to the controller task. Each carries its reply channel.
#[derive(Debug)]
pub enum Command {
    SwitchMode {
        mode: Mode,
        reply: oneshot::Sender<StatusSnapshot>,
    },
    SetValue {
        key: SettingKey,
        value: String,
        reply: oneshot::Sender<Result<Settings>>,
    },
    StartTimer {
        kind: TimerKind,
        entered: Option<String>,
        reply: oneshot::Sender<Result<bool>>,
    },
    CancelTimer {
        kind: TimerKind,
        reply: oneshot::Sender<bool>,
    },
    SetMonitoring {
        enabled: bool,
        reply: oneshot::Sender<bool>,
    },
}

/// Sends commands to a running [`ModeController`](super::ModeController)
/// and reads its published status.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<StatusSnapshot>,
}

impl ControlHandle {
    /// Create a handle and the receiving end to pass to
    /// [`ModeController::run`](super::ModeController::run).
    pub fn channel(status: watch::Receiver<StatusSnapshot>) -> (Self, mpsc::Receiver<Command>) {
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        (Self { commands, status }, rx)
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.commands.send(build(reply)).await?;
        Ok(rx.await?)
    }

    pub async fn switch_mode(&self, mode: Mode) -> Result<StatusSnapshot> {
        self.request(|reply| Command::SwitchMode { mode, reply }).await
    }

    pub async fn set_value(&self, key: SettingKey, value: impl Into<String>) -> Result<Settings> {
        let value = value.into();
        self.request(|reply| Command::SetValue { key, value, reply })
            .await?
    }

    /// Start a countdown, optionally with a user-entered length in minutes.
    pub async fn start_timer(&self, kind: TimerKind, entered: Option<String>) -> Result<bool> {
        self.request(|reply| Command::StartTimer {
            kind,
            entered,
            reply,
        })
        .await?
    }

    pub async fn cancel_timer(&self, kind: TimerKind) -> Result<bool> {
        self.request(|reply| Command::CancelTimer { kind, reply }).await
    }

    pub async fn set_monitoring(&self, enabled: bool) -> Result<bool> {
        self.request(|reply| Command::SetMonitoring { enabled, reply })
            .await
    }

    /// Latest published status.
    pub fn status(&self) -> StatusSnapshot {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.clone()
    }
}
