//! Epoch Clock
//!
//! A process-wide counter that advances once per committed write. Every
//! node records the epoch at which its value last changed and the epoch at
//! which it was last verified; comparing the two is how staleness is
//! detected without walking values.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static CURRENT: AtomicU64 = AtomicU64::new(0);

/// An opaque, totally ordered point in the mutation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Epoch(u64);

impl Epoch {
    pub const ZERO: Epoch = Epoch(0);

    /// The epoch of the most recent committed write.
    pub fn current() -> Self {
        Self(CURRENT.load(Ordering::SeqCst))
    }

    /// Advance the clock and return the new epoch. Never reuses a value.
    pub(crate) fn advance() -> Self {
        Self(CURRENT.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The epoch immediately after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}
