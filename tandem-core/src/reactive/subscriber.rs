//! Subscribers
//!
//! A subscriber splits an effect into two halves: a tracked `compute_deps`
//! function that reads whatever the subscriber cares about, and an untracked
//! callback that receives the result. `compute_deps` runs once at
//! registration to establish dependencies; the callback only runs on later
//! batches in which one of those dependencies actually changed.

use std::fmt;

use super::effect::Effect;
use super::runtime::Runtime;
use crate::graph::NodeId;

/// Entry point for registering subscribers.
pub struct Subscriber;

impl Subscriber {
    /// Register a subscriber.
    ///
    /// The callback runs at most once per batch, after all writes in the
    /// batch have been applied, and never for a dependency that was
    /// invalidated but recomputed to an equal value. Reads made inside the
    /// callback are not tracked.
    pub fn register<D, C, F>(runtime: &Runtime, compute_deps: C, mut callback: F) -> Subscription
    where
        C: Fn() -> D + Send + 'static,
        F: FnMut(D) + Send + 'static,
    {
        let scope = runtime.clone();
        let mut primed = false;
        let effect = Effect::new(runtime, move || {
            let deps = compute_deps();
            if !primed {
                primed = true;
                return;
            }
            scope.untracked(|| callback(deps));
        });

        Subscription { effect }
    }
}

/// Handle to a registered subscriber.
///
/// Dropping the handle unregisters the subscriber.
#[must_use = "dropping a Subscription unregisters it immediately"]
pub struct Subscription {
    effect: Effect,
}

impl Subscription {
    /// Get the subscriber's node ID.
    pub fn id(&self) -> NodeId {
        self.effect.id()
    }

    /// Whether the subscriber is still registered.
    pub fn is_active(&self) -> bool {
        !self.effect.is_disposed()
    }

    /// Unregister the subscriber. A run already queued by the current batch
    /// is dropped.
    pub fn unsubscribe(self) {
        self.effect.dispose();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.effect.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id())
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn callback_waits_for_a_change() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 1);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let _subscription = Subscriber::register(
            &runtime,
            {
                let signal = signal.clone();
                move || signal.get()
            },
            {
                let seen = seen.clone();
                move |value| seen.lock().push(value)
            },
        );
        assert!(seen.lock().is_empty());

        signal.set(2);
        signal.set(2);
        assert_eq!(*seen.lock(), vec![2]);
    }

    #[test]
    fn unsubscribe_inside_batch_drops_pending_run() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 1);
        let calls = Arc::new(Mutex::new(0));

        let subscription = Subscriber::register(
            &runtime,
            {
                let signal = signal.clone();
                move || signal.get()
            },
            {
                let calls = calls.clone();
                move |_| *calls.lock() += 1
            },
        );

        runtime.batch(|| {
            signal.set(5);
            subscription.unsubscribe();
        });

        assert_eq!(*calls.lock(), 0);
    }

    #[test]
    fn callback_reads_are_untracked() {
        let runtime = Runtime::new();
        let trigger = Signal::new(&runtime, 0);
        let other = Signal::new(&runtime, 0);
        let calls = Arc::new(Mutex::new(0));

        let _subscription = Subscriber::register(
            &runtime,
            {
                let trigger = trigger.clone();
                move || trigger.get()
            },
            {
                let (other, calls) = (other.clone(), calls.clone());
                move |_| {
                    other.get();
                    *calls.lock() += 1;
                }
            },
        );

        trigger.set(1);
        other.set(1);
        assert_eq!(*calls.lock(), 1);
    }
}
