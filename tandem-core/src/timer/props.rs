//! Timer Properties
//!
//! The timer lives in a shared document field as a small JSON record. All
//! transitions here are pure: they take the current props and the server
//! time and return the next props, or an [`InvalidTransition`] when the
//! operation makes no sense in the current state.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::InvalidTransition;

const FIVE_SECONDS: Duration = Duration::from_secs(5);
const THIRTY_SECONDS: Duration = Duration::from_secs(30);
const ONE_MINUTE: Duration = Duration::from_secs(60);
const FIVE_MINUTES: Duration = Duration::from_secs(5 * 60);

/// Timers shorter than this cannot be decreased further.
pub const MIN_DECREASABLE: Duration = Duration::from_secs(10);

/// Milliseconds on the shared server time base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ServerTimestamp(u64);

impl<'de> Deserialize<'de> for ServerTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        millis::lenient(deserializer).map(Self)
    }
}

impl ServerTimestamp {
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`, or zero if `earlier` is in the future.
    pub fn saturating_duration_since(self, earlier: ServerTimestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Display for ServerTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Durations and timestamps travel as integer milliseconds. Peers may send
/// fractional or negative numbers; those are truncated and clamped at zero.
mod millis {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        lenient(deserializer).map(Duration::from_millis)
    }

    /// Whole milliseconds from any JSON number.
    pub(super) fn lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let millis = f64::deserialize(deserializer)?;
        if millis.is_finite() && millis > 0.0 {
            // Saturates at u64::MAX.
            Ok(millis as u64)
        } else {
            Ok(0)
        }
    }
}

/// Where the countdown is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum TimerState {
    Stopped,
    /// Counting down since `last_start_time` on the server clock.
    Running {
        #[serde(rename = "lastStartTime")]
        last_start_time: ServerTimestamp,
    },
    Paused,
    Completed,
}

impl TimerState {
    pub fn status(&self) -> TimerStatus {
        match self {
            Self::Stopped => TimerStatus::Stopped,
            Self::Running { .. } => TimerStatus::Running,
            Self::Paused => TimerStatus::Paused,
            Self::Completed => TimerStatus::Completed,
        }
    }
}

/// [`TimerState`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerStatus {
    Stopped,
    Running,
    Paused,
    Completed,
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
        })
    }
}

/// Operations that can be refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerOperation {
    Play,
    Pause,
    Increase,
    Decrease,
    Complete,
}

impl fmt::Display for TimerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Increase => "increase",
            Self::Decrease => "decrease",
            Self::Complete => "complete",
        })
    }
}

/// Step applied by an increase. Thresholds are exclusive.
pub fn increase_step(initial: Duration) -> Duration {
    if initial < THIRTY_SECONDS {
        FIVE_SECONDS
    } else if initial < FIVE_MINUTES {
        THIRTY_SECONDS
    } else {
        ONE_MINUTE
    }
}

/// Step applied by a decrease. Thresholds are inclusive, so a decrease
/// undoes the increase that crossed a threshold.
pub fn decrease_step(initial: Duration) -> Duration {
    if initial <= THIRTY_SECONDS {
        FIVE_SECONDS
    } else if initial <= FIVE_MINUTES {
        THIRTY_SECONDS
    } else {
        ONE_MINUTE
    }
}

/// The timer record stored in the shared document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerProps {
    #[serde(with = "millis")]
    pub initial_time: Duration,
    #[serde(with = "millis")]
    pub remaining_time: Duration,
    pub state: TimerState,
}

impl TimerProps {
    /// A stopped timer with a full countdown.
    pub fn new(initial_time: Duration) -> Self {
        Self {
            initial_time,
            remaining_time: initial_time,
            state: TimerState::Stopped,
        }
    }

    pub fn status(&self) -> TimerStatus {
        self.state.status()
    }

    fn refuse(&self, operation: TimerOperation) -> InvalidTransition {
        InvalidTransition {
            operation,
            state: self.status(),
        }
    }

    /// Time counted down since the last start. Zero unless running.
    pub fn elapsed(&self, now: ServerTimestamp) -> Duration {
        match self.state {
            TimerState::Running { last_start_time } => now.saturating_duration_since(last_start_time),
            _ => Duration::ZERO,
        }
    }

    /// Time left on the countdown as of `now`.
    pub fn remaining_at(&self, now: ServerTimestamp) -> Duration {
        self.remaining_time.saturating_sub(self.elapsed(now))
    }

    pub fn can_increase(&self) -> bool {
        self.status() != TimerStatus::Running
    }

    pub fn can_decrease(&self) -> bool {
        self.status() != TimerStatus::Running && self.initial_time >= MIN_DECREASABLE
    }

    /// Back to a full, stopped countdown. Legal in every state.
    pub fn reset(&self) -> Self {
        Self::new(self.initial_time)
    }

    /// Start or resume counting down from `now`. A completed timer restarts
    /// from its full duration.
    pub fn play(&self, now: ServerTimestamp) -> Result<Self, InvalidTransition> {
        let remaining_time = match self.status() {
            TimerStatus::Running => return Err(self.refuse(TimerOperation::Play)),
            TimerStatus::Completed => self.initial_time,
            TimerStatus::Stopped | TimerStatus::Paused => self.remaining_time,
        };
        Ok(Self {
            initial_time: self.initial_time,
            remaining_time,
            state: TimerState::Running { last_start_time: now },
        })
    }

    /// Freeze the countdown at what is left as of `now`.
    pub fn pause(&self, now: ServerTimestamp) -> Result<Self, InvalidTransition> {
        if self.status() != TimerStatus::Running {
            return Err(self.refuse(TimerOperation::Pause));
        }
        Ok(Self {
            initial_time: self.initial_time,
            remaining_time: self.remaining_at(now),
            state: TimerState::Paused,
        })
    }

    /// Lengthen the configured duration by one step and refill the countdown.
    pub fn increase(&self) -> Result<Self, InvalidTransition> {
        if !self.can_increase() {
            return Err(self.refuse(TimerOperation::Increase));
        }
        Ok(self.with_initial_time(self.initial_time + increase_step(self.initial_time)))
    }

    /// Shorten the configured duration by one step and refill the countdown.
    pub fn decrease(&self) -> Result<Self, InvalidTransition> {
        if !self.can_decrease() {
            return Err(self.refuse(TimerOperation::Decrease));
        }
        let step = decrease_step(self.initial_time);
        Ok(self.with_initial_time(self.initial_time.saturating_sub(step)))
    }

    /// Mark a running timer whose countdown reached zero as completed.
    pub fn complete(&self, now: ServerTimestamp) -> Result<Self, InvalidTransition> {
        if self.status() != TimerStatus::Running || !self.remaining_at(now).is_zero() {
            return Err(self.refuse(TimerOperation::Complete));
        }
        Ok(Self {
            initial_time: self.initial_time,
            remaining_time: Duration::ZERO,
            state: TimerState::Completed,
        })
    }

    fn with_initial_time(&self, initial_time: Duration) -> Self {
        Self {
            initial_time,
            remaining_time: initial_time,
            state: self.state,
        }
    }
}
