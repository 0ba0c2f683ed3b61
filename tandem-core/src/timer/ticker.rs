//! Completion Watcher

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use super::machine::Timer;
use super::props::TimerStatus;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Poll `timer` every `period` and complete it once its countdown runs out.
/// A zero `period` is raised to one millisecond.
///
/// Returns when the timer is no longer running: with `Completed` if this
/// watcher (or another participant) completed it, with whatever state
/// another participant moved it to, or with `None` if the timer is gone.
pub async fn watch_until_settled(timer: &Timer, period: Duration) -> Option<TimerStatus> {
    let mut ticks = interval(period.max(MIN_PERIOD));
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticks.tick().await;
        match timer.status() {
            Some(TimerStatus::Running) => {
                if timer.complete_if_elapsed() {
                    debug!(key = timer.key(), "timer completed");
                    return Some(TimerStatus::Completed);
                }
            }
            settled => return settled,
        }
    }
}
