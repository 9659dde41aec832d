//! Two-stage shutdown: a main countdown followed by a short confirmation.

use crate::control::shutdown::ShutdownAction;
use crate::timer::{CountdownTimer, Tick, TimerStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Length of the confirmation countdown that precedes the shutdown action.
pub const CONFIRMATION_SECONDS: u64 = 14;

/// Who armed the current sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmSource {
    /// The threshold monitor
    Auto,
    /// A user request
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SequenceState {
    #[default]
    Idle,
    /// Main countdown running
    Counting,
    /// Confirmation countdown running
    Confirming,
}

/// Notable transitions reported by [`ShutdownSequencer::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerEvent {
    ConfirmationStarted,
    ShutdownDispatched,
}

/// Read-only view of the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SequenceStatus {
    pub state: SequenceState,
    pub source: Option<ArmSource>,
    pub main: TimerStatus,
    pub confirmation: TimerStatus,
}

/// Owns the main shutdown countdown and the confirmation countdown.
///
/// When the confirmation expires the shutdown action runs once on a blocking
/// thread. Its failure is logged and the sequencer returns to idle either
/// way. Cancelling never interrupts an action that is already running.
pub struct ShutdownSequencer {
    main: CountdownTimer,
    confirmation: CountdownTimer,
    action: Arc<dyn ShutdownAction>,
    source: Option<ArmSource>,
    in_flight: Option<JoinHandle<()>>,
}

impl ShutdownSequencer {
    pub fn new(action: Arc<dyn ShutdownAction>) -> Self {
        Self {
            main: CountdownTimer::new("shutdown"),
            confirmation: CountdownTimer::new("confirmation"),
            action,
            source: None,
            in_flight: None,
        }
    }

    /// Arm the main countdown. Rejected while either stage is running.
    pub fn arm(&mut self, minutes: u32, source: ArmSource) -> bool {
        if self.is_active() {
            warn!(?source, "Shutdown already counting down, not starting another");
            return false;
        }

        let armed = self.main.start(minutes as u64 * 60);
        if armed {
            self.source = Some(source);
            info!(minutes, ?source, "Shutdown countdown started");
        }
        armed
    }

    /// Abort both stages and return to idle.
    pub fn cancel(&mut self) -> bool {
        let main = self.main.cancel();
        let confirmation = self.confirmation.cancel();
        if main || confirmation {
            info!("Shutdown sequence cancelled");
            self.source = None;
        }
        main || confirmation
    }

    /// Dismiss the confirmation countdown, aborting the whole sequence.
    pub fn dismiss_confirmation(&mut self) -> bool {
        if !self.confirmation.is_running() {
            return false;
        }
        self.cancel()
    }

    /// Advance both stages by one second.
    pub fn tick(&mut self) -> Option<SequencerEvent> {
        if let Tick::Expired = self.main.tick() {
            self.confirmation.start(CONFIRMATION_SECONDS);
            warn!(
                seconds = CONFIRMATION_SECONDS,
                "Shutdown countdown finished, confirming"
            );
            return Some(SequencerEvent::ConfirmationStarted);
        }

        if let Tick::Expired = self.confirmation.tick() {
            self.dispatch();
            self.source = None;
            return Some(SequencerEvent::ShutdownDispatched);
        }

        None
    }

    fn dispatch(&mut self) {
        let action = Arc::clone(&self.action);
        info!(action = action.name(), "Dispatching shutdown action");
        self.in_flight = Some(tokio::task::spawn_blocking(move || {
            if let Err(e) = action.execute() {
                error!("{}", e);
            }
        }));
    }

    /// Wait for a dispatched shutdown action to finish.
    pub async fn wait_for_dispatch(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            if let Err(e) = handle.await {
                error!("Shutdown action task failed: {}", e);
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.main.is_running() || self.confirmation.is_running()
    }

    pub fn state(&self) -> SequenceState {
        if self.confirmation.is_running() {
            SequenceState::Confirming
        } else if self.main.is_running() {
            SequenceState::Counting
        } else {
            SequenceState::Idle
        }
    }

    pub fn source(&self) -> Option<ArmSource> {
        self.source
    }

    pub fn status(&self) -> SequenceStatus {
        SequenceStatus {
            state: self.state(),
            source: self.source,
            main: self.main.status(),
            confirmation: self.confirmation.status(),
        }
    }
}
