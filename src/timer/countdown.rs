//! Cancellable per-second countdown.
//!
//! ```text
//!            start(n)            n ticks
//!  Idle ───────────────► Running ────────► Expired
//!   ▲                      │
//!   │                      │ cancel()
//!   │                      ▼
//!   └──── start(n) ─── Cancelled
//! ```
//!
//! The timer owns no clock. Its owner calls [`CountdownTimer::tick`] once per
//! second from the cooperative scheduler and reacts to [`Tick::Expired`],
//! which is returned exactly once per run.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Lifecycle state of a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    #[default]
    Idle,
    Running,
    Expired,
    Cancelled,
}

/// Result of advancing a countdown by one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The timer is not running
    Inactive,
    /// Still counting; seconds left after this tick
    Running(u64),
    /// Reached zero on this tick
    Expired,
}

/// Read-only view of a countdown for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TimerStatus {
    pub state: TimerState,
    pub total_seconds: u64,
    pub remaining_seconds: u64,
}

impl TimerStatus {
    /// Remaining time as `mm:ss` (minutes are not wrapped at 60).
    pub fn clock(&self) -> String {
        format!("{:02}:{:02}", self.remaining_seconds / 60, self.remaining_seconds % 60)
    }
}

/// A reusable countdown.
#[derive(Debug, Clone)]
pub struct CountdownTimer {
    name: &'static str,
    state: TimerState,
    total_seconds: u64,
    remaining_seconds: u64,
}

impl CountdownTimer {
    /// Create an idle timer; `name` only appears in logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: TimerState::Idle,
            total_seconds: 0,
            remaining_seconds: 0,
        }
    }

    /// Start counting down from `total_seconds`.
    ///
    /// Rejected while already running or for a zero duration. A timer that
    /// expired or was cancelled may be started again.
    pub fn start(&mut self, total_seconds: u64) -> bool {
        if self.state == TimerState::Running {
            debug!(timer = self.name, "Start rejected: already running");
            return false;
        }
        if total_seconds == 0 {
            debug!(timer = self.name, "Start rejected: zero duration");
            return false;
        }

        self.state = TimerState::Running;
        self.total_seconds = total_seconds;
        self.remaining_seconds = total_seconds;
        debug!(timer = self.name, total_seconds, "Countdown started");
        true
    }

    /// Cancel a running countdown. No-op unless running.
    pub fn cancel(&mut self) -> bool {
        if self.state != TimerState::Running {
            return false;
        }

        self.state = TimerState::Cancelled;
        self.remaining_seconds = 0;
        debug!(timer = self.name, "Countdown cancelled");
        true
    }

    /// Advance by one second.
    pub fn tick(&mut self) -> Tick {
        if self.state != TimerState::Running {
            return Tick::Inactive;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.state = TimerState::Expired;
            debug!(timer = self.name, "Countdown expired");
            Tick::Expired
        } else {
            Tick::Running(self.remaining_seconds)
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn total_seconds(&self) -> u64 {
        self.total_seconds
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn status(&self) -> TimerStatus {
        TimerStatus {
            state: self.state,
            total_seconds: self.total_seconds,
            remaining_seconds: self.remaining_seconds,
        }
    }
}
