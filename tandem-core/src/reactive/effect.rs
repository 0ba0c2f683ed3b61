//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever the
//! values it read have changed.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When a dependency is written, the effect is queued, not run. The queue
//!    is drained when the surrounding batch closes.
//!
//! 3. At drain time the effect first verifies its dependencies. It re-runs
//!    only if one of them actually changed value; a dependency that was
//!    invalidated but recomputed to an equal value does not count.
//!
//! 4. Each run replaces the dependency set with whatever it read.
//!
//! # Differences from Derived
//!
//! - Derived values return a value; effects do not.
//! - Derived values are lazy (compute on access); effects are eager (run
//!   when a batch that touched their inputs completes).

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, error};

use super::runtime::{Reactive, Runtime};
use crate::error::Result;
use crate::graph::{DirtyState, Epoch, NodeId, NodeKind};

type EffectFn = Box<dyn FnMut() + Send>;

struct EffectInner {
    id: NodeId,
    runtime: Runtime,
    run: Mutex<EffectFn>,
    disposed: AtomicBool,
    run_count: AtomicUsize,
}

impl EffectInner {
    /// Run the effect function within a tracking frame.
    fn execute(&self) -> Result<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Ok(());
        }

        let started = Epoch::current();
        {
            let mut run = self.run.lock();
            self.runtime.evaluate(self.id, || (*run)())?;
        }

        self.run_count.fetch_add(1, Ordering::SeqCst);
        self.runtime.mark_verified(self.id, started, false);
        Ok(())
    }
}

impl Reactive for EffectInner {
    fn refresh(&self) -> Result<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Ok(());
        }

        let epoch = Epoch::current();
        match self.runtime.dirty_state(self.id) {
            DirtyState::Clean => Ok(()),
            DirtyState::MaybeDirty if !self.runtime.dependencies_changed(self.id)? => {
                self.runtime.mark_verified(self.id, epoch, false);
                Ok(())
            }
            DirtyState::MaybeDirty | DirtyState::Dirty => {
                debug!(node = %self.id, "re-running effect");
                self.execute()
            }
        }
    }
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        self.runtime.release(self.id);
    }
}

/// A side-effecting computation that runs when dependencies change.
///
/// Dropping the last handle unregisters the effect.
///
/// # Example
///
/// ```rust
/// use tandem_core::reactive::{Effect, Runtime, Signal};
///
/// let runtime = Runtime::new();
/// let count = Signal::new(&runtime, 0);
///
/// let effect = Effect::new(&runtime, {
///     let count = count.clone();
///     move || println!("Count is: {}", count.get())
/// });
///
/// count.set(5); // Prints: "Count is: 5"
/// assert_eq!(effect.run_count(), 2);
/// ```
pub struct Effect {
    inner: Arc<EffectInner>,
}

impl Effect {
    /// Create a new effect with the given function.
    ///
    /// The function runs immediately to establish dependencies.
    ///
    /// # Panics
    ///
    /// Panics if the first run reads a derived value caught in a cycle.
    pub fn new<F>(runtime: &Runtime, run: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let inner = Arc::new(EffectInner {
            id: runtime.add_node(NodeKind::Effect),
            runtime: runtime.clone(),
            run: Mutex::new(Box::new(run)),
            disposed: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        });

        let weak: Weak<dyn Reactive> = Arc::downgrade(&inner) as Weak<dyn Reactive>;
        runtime.register(inner.id, weak);

        // Run immediately to establish dependencies. Writes made by the first
        // run flush once it returns.
        if let Err(err) = runtime.batch(|| inner.execute()) {
            error!(node = %inner.id, %err, "effect failed on first run");
            panic!("{err}");
        }

        Self { inner }
    }

    /// Get the effect's node ID.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Dispose of the effect.
    ///
    /// After disposal the effect will not run again, including any run
    /// already queued by the current batch.
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::SeqCst) {
            self.inner.runtime.release(self.inner.id);
        }
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
