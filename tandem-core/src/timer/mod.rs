//! Shared Countdown Timer
//!
//! A countdown stored in a shared document field and measured against a
//! server clock:
//!
//! - [`props`](TimerProps): the stored record and its pure transitions
//! - [`ServerClock`]: where "now" comes from
//! - [`Timer`]: the state machine bound to a document
//! - [`watch_until_settled`]: drives completion from an async task

mod clock;
mod machine;
mod props;
mod ticker;

pub use clock::{ManualClock, ServerClock, SyncedClock};
pub use machine::Timer;
pub use props::{
    decrease_step, increase_step, ServerTimestamp, TimerOperation, TimerProps, TimerState,
    TimerStatus, MIN_DECREASABLE,
};
pub use ticker::watch_until_settled;
