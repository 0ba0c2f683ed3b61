//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (derived value or
//!    effect), the read is recorded as a dependency of that context.
//!
//! 2. When a signal is written with a value that differs from the current
//!    one, the epoch clock advances and every transitive dependent is marked
//!    maybe dirty.
//!
//! 3. Effects reached by that propagation run once the surrounding batch
//!    closes; derived values wait until they are read.
//!
//! # Equality
//!
//! By default a write that compares equal to the current value is dropped.
//! [`Signal::without_equality`] builds a signal where every write counts.

use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use super::runtime::Runtime;
use crate::graph::{Epoch, NodeId, NodeKind};

type EqFn<T> = fn(&T, &T) -> bool;

struct SignalInner<T> {
    id: NodeId,
    runtime: Runtime,
    value: RwLock<T>,
    eq: Option<EqFn<T>>,
}

impl<T> Drop for SignalInner<T> {
    fn drop(&mut self) {
        self.runtime.release(self.id);
    }
}

/// A reactive signal holding a value of type T.
///
/// Cloning a signal yields another handle to the same cell.
///
/// # Example
///
/// ```rust
/// use tandem_core::reactive::{Runtime, Signal};
///
/// let runtime = Runtime::new();
/// let count = Signal::new(&runtime, 0);
///
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<SignalInner<T>>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// Create a new signal with the given initial value.
    ///
    /// Writes equal to the current value are ignored.
    pub fn new(runtime: &Runtime, value: T) -> Self {
        Self::build(runtime, value, Some(<T as PartialEq>::eq as EqFn<T>))
    }
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a signal whose every write is treated as a change.
    pub fn without_equality(runtime: &Runtime, value: T) -> Self {
        Self::build(runtime, value, None)
    }

    fn build(runtime: &Runtime, value: T, eq: Option<EqFn<T>>) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                id: runtime.add_node(NodeKind::Source),
                runtime: runtime.clone(),
                value: RwLock::new(value),
                eq,
            }),
        }
    }

    /// Get the signal's node ID.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, this also records the signal as
    /// a dependency of the running computation.
    pub fn get(&self) -> T {
        self.inner.runtime.track(self.inner.id);
        self.inner.value.read().clone()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Run `f` on the current value. Tracks like [`get`](Self::get).
    ///
    /// `f` sees a snapshot taken before it runs, so it may write to this
    /// signal without holding up the lock.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.get();
        f(&value)
    }

    /// Set a new value and invalidate dependents.
    ///
    /// Returns `false` if the write was dropped because the value was equal.
    pub fn set(&self, value: T) -> bool {
        {
            let mut guard = self.inner.value.write();
            if let Some(eq) = self.inner.eq {
                if eq(&*guard, &value) {
                    trace!(node = %self.inner.id, "ignoring write of equal value");
                    return false;
                }
            }
            *guard = value;
        }

        self.inner.runtime.write(self.inner.id);
        true
    }

    /// Update the value using a function of the current value.
    ///
    /// The read and the write are one logical operation: dependents observe
    /// a single change.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let current = self.get_untracked();
        self.set(f(&current))
    }

    /// The epoch of the last write that changed this signal.
    pub fn last_changed(&self) -> Option<Epoch> {
        self.inner.runtime.changed_at(self.inner.id)
    }

    /// The runtime this signal belongs to.
    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.read())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
