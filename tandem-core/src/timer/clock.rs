//! Server Clocks
//!
//! Elapsed time is always measured against the shared server time base so
//! that participants with skewed local clocks agree on what is left.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::trace;

use super::props::ServerTimestamp;

/// Source of the current server time.
pub trait ServerClock: Send + Sync {
    fn now(&self) -> ServerTimestamp;
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    pub fn new(start: ServerTimestamp) -> Self {
        Self {
            millis: AtomicU64::new(start.as_millis()),
        }
    }

    pub fn set(&self, now: ServerTimestamp) {
        self.millis.store(now.as_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.millis.fetch_add(by, Ordering::SeqCst);
    }
}

impl ServerClock for ManualClock {
    fn now(&self) -> ServerTimestamp {
        ServerTimestamp::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

fn unix_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since) => i64::try_from(since.as_millis()).unwrap_or(i64::MAX),
        Err(before) => -i64::try_from(before.duration().as_millis()).unwrap_or(i64::MAX),
    }
}

/// The local wall clock corrected by the offset to the server.
///
/// Until the first [`observe`](Self::observe) the offset is zero and the
/// clock reads local time.
#[derive(Debug, Default)]
pub struct SyncedClock {
    offset_ms: AtomicI64,
}

impl SyncedClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the server reported `server` when the local clock read
    /// `local`.
    pub fn observe(&self, server: ServerTimestamp, local: SystemTime) {
        let server = i64::try_from(server.as_millis()).unwrap_or(i64::MAX);
        let offset = server.saturating_sub(unix_millis(local));
        trace!(offset_ms = offset, "server clock offset updated");
        self.offset_ms.store(offset, Ordering::SeqCst);
    }

    /// Server time minus local time, in milliseconds.
    pub fn offset_ms(&self) -> i64 {
        self.offset_ms.load(Ordering::SeqCst)
    }

    /// Server time corresponding to the local instant `local`.
    pub fn at(&self, local: SystemTime) -> ServerTimestamp {
        let millis = unix_millis(local).saturating_add(self.offset_ms());
        ServerTimestamp::from_millis(u64::try_from(millis).unwrap_or(0))
    }
}

impl ServerClock for SyncedClock {
    fn now(&self) -> ServerTimestamp {
        self.at(SystemTime::now())
    }
}
