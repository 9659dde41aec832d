//! Countdown timers and the one-second scheduler tick that drives them.

pub mod countdown;

pub use countdown::{CountdownTimer, Tick, TimerState, TimerStatus};

use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Period of the cooperative scheduler.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Interval that first fires one period from now and never bursts to catch
/// up on missed ticks.
pub fn second_ticker() -> Interval {
    let mut ticker = time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
