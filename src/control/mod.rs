//! Mode state machine, threshold evaluation and the shutdown sequence.
//!
//! The [`ModeController`] runs on its own task and owns every countdown.
//! Readings arrive from the sensor poller over a watch channel and user
//! requests arrive through a [`ControlHandle`].

pub mod controller;
pub mod handle;
pub mod monitor;
pub mod sequencer;
pub mod shutdown;

pub use controller::{ModeChange, ModeController, StatusSnapshot, TimerKind, TransitionCause};
pub use handle::{Command, ControlHandle};
pub use monitor::{HoldReason, ThresholdMonitor, Verdict};
pub use sequencer::{ArmSource, SequenceState, SequenceStatus, ShutdownSequencer, CONFIRMATION_SECONDS};
pub use shutdown::{LogOnlyShutdown, ShutdownAction, SystemShutdown};
