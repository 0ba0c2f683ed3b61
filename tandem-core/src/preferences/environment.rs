//! Environment Color Scheme
//!
//! The host environment reports light/dark changes through a listener
//! interface. Listening is scoped: [`EnvironmentSubscription`] registers a
//! listener on creation and removes it when dropped, so the listener lives
//! exactly as long as the preferences that own it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::debug;

use super::record::SystemColorScheme;

/// Callback invoked with the new scheme whenever it changes.
pub type SchemeListener = Arc<dyn Fn(SystemColorScheme) + Send + Sync>;

/// Identifies one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A host environment that can report its light/dark setting.
pub trait ColorSchemeSource: Send + Sync {
    /// The scheme in effect right now.
    fn current(&self) -> SystemColorScheme;

    /// Register a listener for subsequent changes.
    fn subscribe(&self, listener: SchemeListener) -> ListenerId;

    /// Remove a listener. Unknown ids are ignored.
    fn unsubscribe(&self, id: ListenerId);
}

/// A listener registration, removed when dropped.
pub struct EnvironmentSubscription {
    source: Arc<dyn ColorSchemeSource>,
    id: ListenerId,
}

impl EnvironmentSubscription {
    pub fn attach(source: Arc<dyn ColorSchemeSource>, listener: SchemeListener) -> Self {
        let id = source.subscribe(listener);
        Self { source, id }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for EnvironmentSubscription {
    fn drop(&mut self) {
        self.source.unsubscribe(self.id);
    }
}

impl fmt::Debug for EnvironmentSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentSubscription")
            .field("id", &self.id)
            .finish()
    }
}

/// An in-process scheme source, for headless hosts and tests.
pub struct ManualColorScheme {
    current: Mutex<SystemColorScheme>,
    listeners: Mutex<IndexMap<ListenerId, SchemeListener>>,
    next_id: AtomicU64,
}

impl ManualColorScheme {
    pub fn new(initial: SystemColorScheme) -> Self {
        Self {
            current: Mutex::new(initial),
            listeners: Mutex::new(IndexMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Change the scheme and notify listeners if it differs.
    pub fn set(&self, scheme: SystemColorScheme) {
        {
            let mut current = self.current.lock();
            if *current == scheme {
                return;
            }
            *current = scheme;
        }
        debug!(?scheme, "environment color scheme changed");

        // Call listeners outside the lock so they may unsubscribe.
        let listeners: Vec<SchemeListener> = self.listeners.lock().values().cloned().collect();
        for listener in listeners {
            listener(scheme);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl ColorSchemeSource for ManualColorScheme {
    fn current(&self) -> SystemColorScheme {
        *self.current.lock()
    }

    fn subscribe(&self, listener: SchemeListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().insert(id, listener);
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners.lock().shift_remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn subscription_is_released_on_drop() {
        let source = Arc::new(ManualColorScheme::new(SystemColorScheme::Light));
        let calls = Arc::new(AtomicUsize::new(0));

        let subscription = EnvironmentSubscription::attach(source.clone(), {
            let calls = calls.clone();
            Arc::new(move |_: SystemColorScheme| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        });
        assert_eq!(source.listener_count(), 1);

        source.set(SystemColorScheme::Dark);
        source.set(SystemColorScheme::Dark);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        drop(subscription);
        assert_eq!(source.listener_count(), 0);

        source.set(SystemColorScheme::Light);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
