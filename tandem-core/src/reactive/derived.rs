//! Derived Value Implementation
//!
//! A Derived value is a cached computation over signals and other derived
//! values. It re-evaluates only when one of the inputs it actually read has
//! changed.
//!
//! # How Derived Values Work
//!
//! 1. Construction does not compute anything. The first `get` runs the
//!    computation and caches the result.
//!
//! 2. When a transitive input is written, the node is marked "maybe dirty".
//!    No work happens yet.
//!
//! 3. On the next `get`, each recorded dependency is brought up to date in
//!    read order. If none changed value since our last verification, the
//!    node is marked clean and the cache is returned.
//!
//! 4. Otherwise the computation re-runs under a fresh tracking frame and its
//!    dependency set is replaced with whatever it read this time.
//!
//! # Why This Matters
//!
//! - A signal changes
//! - 10 derived values depend on it
//! - Only the ones actually read will recompute
//! - One that recomputes to an equal value does not disturb its dependents
//!
//! # Cycles
//!
//! A derived value that is read while it is being evaluated fails with
//! [`GraphError::CyclicDependency`]. [`Derived::try_get`] returns the error;
//! [`Derived::get`] treats it as a fatal defect and panics.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::trace;

use super::runtime::{Reactive, Runtime};
use crate::error::{GraphError, Result};
use crate::graph::{DirtyState, Epoch, NodeId, NodeKind};

struct DerivedInner<T> {
    id: NodeId,
    runtime: Runtime,
    compute: Box<dyn Fn() -> T + Send + Sync>,
    value: RwLock<Option<T>>,
    compute_count: AtomicUsize,
}

impl<T> DerivedInner<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    fn cached(&self) -> Option<T> {
        self.value.read().clone()
    }

    /// Bring the value up to date and return it.
    fn update(&self) -> Result<T> {
        self.runtime.check_cycle(self.id)?;
        let epoch = Epoch::current();

        match self.runtime.dirty_state(self.id) {
            DirtyState::Clean => {
                if let Some(value) = self.cached() {
                    return Ok(value);
                }
            }
            DirtyState::MaybeDirty => {
                if let Some(value) = self.cached() {
                    if !self.runtime.dependencies_changed(self.id)? {
                        trace!(node = %self.id, "derived value verified without recomputing");
                        self.runtime.mark_verified(self.id, epoch, false);
                        return Ok(value);
                    }
                }
            }
            DirtyState::Dirty => {}
        }

        self.recompute()
    }

    fn recompute(&self) -> Result<T> {
        let started = Epoch::current();
        let new_value = self.runtime.evaluate(self.id, || (self.compute)())?;
        self.compute_count.fetch_add(1, Ordering::Relaxed);

        // Keep the previous value when equal so dependents see no change.
        let changed = {
            let mut slot = self.value.write();
            let changed = slot.as_ref() != Some(&new_value);
            if changed {
                *slot = Some(new_value.clone());
            }
            changed
        };

        self.runtime.mark_verified(self.id, started, changed);
        trace!(node = %self.id, changed, "derived value recomputed");
        Ok(new_value)
    }
}

impl<T> Reactive for DerivedInner<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    fn refresh(&self) -> Result<()> {
        self.update().map(drop)
    }
}

impl<T> Drop for DerivedInner<T> {
    fn drop(&mut self) {
        self.runtime.release(self.id);
    }
}

/// A cached derived value that recomputes only when its inputs change.
///
/// The `PartialEq` bound is what makes updates glitch-free: a recomputation
/// that produces an equal value is not reported as a change.
///
/// # Example
///
/// ```rust
/// use tandem_core::reactive::{Derived, Runtime, Signal};
///
/// let runtime = Runtime::new();
/// let count = Signal::new(&runtime, 2);
/// let doubled = Derived::new(&runtime, {
///     let count = count.clone();
///     move || count.get() * 2
/// });
///
/// assert_eq!(doubled.get(), 4);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Derived<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    inner: Arc<DerivedInner<T>>,
}

impl<T> Derived<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// Create a new derived value with the given computation function.
    ///
    /// The computation is not run immediately. It runs on first access.
    pub fn new<F>(runtime: &Runtime, compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let inner = Arc::new(DerivedInner {
            id: runtime.add_node(NodeKind::Derived),
            runtime: runtime.clone(),
            compute: Box::new(compute),
            value: RwLock::new(None),
            compute_count: AtomicUsize::new(0),
        });

        let weak: Weak<dyn Reactive> = Arc::downgrade(&inner) as Weak<dyn Reactive>;
        runtime.register(inner.id, weak);

        Self { inner }
    }

    /// Get the node ID.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Get the current value, recomputing if necessary.
    ///
    /// Records this value as a dependency of the running computation, if any.
    pub fn try_get(&self) -> Result<T> {
        let value = self.inner.update()?;
        self.inner.runtime.track(self.inner.id);
        Ok(value)
    }

    /// Get the current value, recomputing if necessary.
    ///
    /// # Panics
    ///
    /// Panics if the value is part of a dependency cycle.
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(err @ GraphError::CyclicDependency { .. }) => panic!("{err}"),
        }
    }

    /// Whether the cached value is known to be current.
    pub fn is_stale(&self) -> bool {
        self.inner.runtime.dirty_state(self.inner.id) != DirtyState::Clean
    }

    /// Check if the value has been computed at least once.
    pub fn has_value(&self) -> bool {
        self.inner.value.read().is_some()
    }

    /// How many times the computation has run.
    pub fn compute_count(&self) -> usize {
        self.inner.compute_count.load(Ordering::Relaxed)
    }
}

impl<T> Clone for Derived<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Derived<T>
where
    T: Clone + Send + Sync + PartialEq + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("id", &self.inner.id)
            .field("stale", &self.is_stale())
            .field("value", &*self.inner.value.read())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;
    use std::sync::OnceLock;

    #[test]
    fn derived_computes_on_first_access() {
        let runtime = Runtime::new();
        let derived = Derived::new(&runtime, || 42);

        // Not computed yet
        assert!(!derived.has_value());
        assert_eq!(derived.compute_count(), 0);

        // First access triggers computation
        assert_eq!(derived.get(), 42);
        assert_eq!(derived.compute_count(), 1);
        assert!(derived.has_value());
    }

    #[test]
    fn derived_caches_value_when_clean() {
        let runtime = Runtime::new();
        let derived = Derived::new(&runtime, || 42);

        assert_eq!(derived.get(), 42);
        assert_eq!(derived.get(), 42);
        assert_eq!(derived.get(), 42);
        assert_eq!(derived.compute_count(), 1);
    }

    #[test]
    fn write_marks_stale_without_recomputing() {
        let runtime = Runtime::new();
        let count = Signal::new(&runtime, 1);
        let doubled = Derived::new(&runtime, {
            let count = count.clone();
            move || count.get() * 2
        });

        assert_eq!(doubled.get(), 2);
        count.set(3);
        count.set(4);

        assert!(doubled.is_stale());
        assert_eq!(doubled.compute_count(), 1);

        assert_eq!(doubled.get(), 8);
        assert_eq!(doubled.compute_count(), 2);
        assert!(!doubled.is_stale());
    }

    #[test]
    fn equal_recompute_does_not_propagate() {
        let runtime = Runtime::new();
        let count = Signal::new(&runtime, 2);
        let parity = Derived::new(&runtime, {
            let count = count.clone();
            move || count.get() % 2
        });
        let label = Derived::new(&runtime, {
            let parity = parity.clone();
            move || if parity.get() == 0 { "even" } else { "odd" }
        });

        assert_eq!(label.get(), "even");
        count.set(4);

        assert_eq!(label.get(), "even");
        assert_eq!(parity.compute_count(), 2);
        assert_eq!(label.compute_count(), 1);
    }

    #[test]
    fn dependencies_follow_the_branch_taken() {
        let runtime = Runtime::new();
        let use_left = Signal::new(&runtime, true);
        let left = Signal::new(&runtime, 1);
        let right = Signal::new(&runtime, 10);
        let picked = Derived::new(&runtime, {
            let (use_left, left, right) = (use_left.clone(), left.clone(), right.clone());
            move || if use_left.get() { left.get() } else { right.get() }
        });

        assert_eq!(picked.get(), 1);

        // Not read on this branch.
        right.set(20);
        assert!(!picked.is_stale());

        use_left.set(false);
        assert_eq!(picked.get(), 20);

        // No longer read after switching.
        left.set(2);
        assert!(!picked.is_stale());
        assert_eq!(picked.compute_count(), 2);
    }

    #[test]
    fn self_reference_is_reported_as_cycle() {
        let runtime = Runtime::new();
        let slot: Arc<OnceLock<Derived<i32>>> = Arc::new(OnceLock::new());
        let derived = Derived::new(&runtime, {
            let slot = Arc::clone(&slot);
            move || match slot.get() {
                Some(me) => me.try_get().unwrap_or(-1) + 1,
                None => 0,
            }
        });
        slot.set(derived.clone()).expect("slot is empty");

        let err = derived.try_get().unwrap_err();
        assert_eq!(err, GraphError::CyclicDependency { node: derived.id() });
        assert!(!derived.has_value());
    }

    #[test]
    #[should_panic(expected = "cyclic dependency")]
    fn get_panics_on_cycle() {
        let runtime = Runtime::new();
        let slot: Arc<OnceLock<Derived<i32>>> = Arc::new(OnceLock::new());
        let derived = Derived::new(&runtime, {
            let slot = Arc::clone(&slot);
            move || slot.get().map_or(0, |me| me.get())
        });
        slot.set(derived.clone()).expect("slot is empty");

        derived.get();
    }
}
