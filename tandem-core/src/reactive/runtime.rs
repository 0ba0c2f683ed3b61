//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, derived
//! values, and effects. One runtime exists per document instance; it owns the
//! dependency graph, the tracking stack, and the queue of effects waiting for
//! the current batch to end.
//!
//! # How It Works
//!
//! 1. When a signal, derived value, or effect is created, it registers a node
//!    with the runtime.
//!
//! 2. When a derived value or effect evaluates, every signal or derived value
//!    it reads is recorded in its frame; on exit the frame replaces the
//!    node's edges.
//!
//! 3. When a signal's value changes, the runtime:
//!    a. Advances the epoch clock
//!    b. Marks every transitive dependent as "maybe dirty"
//!    c. Queues the effects it reached
//!    d. Leaves derived values alone; they recompute on next read
//!
//! 4. When the outermost batch closes, queued effects are verified in
//!    registration order. An effect re-runs only if one of its direct
//!    dependencies actually changed value since it last ran.
//!
//! # Threading
//!
//! A runtime models a single logical thread of control. Its state sits
//! behind locks so handles can move between threads, but evaluation is not
//! meant to be driven from several threads at once.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexSet;
use parking_lot::Mutex;
use tracing::{error, trace, warn};

use super::context::{ReactiveContext, TrackingStack};
use crate::config::RuntimeConfig;
use crate::error::{GraphError, Result};
use crate::graph::{DirtyState, Epoch, NodeId, NodeKind, UpdateScheduler};

/// A trait for graph nodes that can bring themselves up to date.
pub trait Reactive: Send + Sync {
    /// Verify the node against its dependencies, recomputing (derived values)
    /// or re-running (effects) if any of them changed.
    fn refresh(&self) -> Result<()>;
}

#[derive(Debug, Default)]
struct BatchState {
    depth: usize,
    flushing: bool,
    pending: IndexSet<NodeId>,
}

struct RuntimeInner {
    config: RuntimeConfig,
    graph: Mutex<UpdateScheduler>,
    // Weak references so that the registry never keeps a value alive.
    registry: Mutex<HashMap<NodeId, Weak<dyn Reactive>>>,
    stack: Mutex<TrackingStack>,
    batch: Mutex<BatchState>,
}

/// Handle to a reactive runtime. Cloning shares the same graph.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Create a runtime with default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                config,
                graph: Mutex::new(UpdateScheduler::new()),
                registry: Mutex::new(HashMap::new()),
                stack: Mutex::new(TrackingStack::default()),
                batch: Mutex::new(BatchState::default()),
            }),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// The epoch of the most recent committed write.
    pub fn epoch(&self) -> Epoch {
        Epoch::current()
    }

    /// Check if reads are currently being recorded as dependencies.
    pub fn is_tracking(&self) -> bool {
        self.with_stack(|stack| stack.is_active())
    }

    /// Number of live nodes in this runtime's graph.
    pub fn node_count(&self) -> usize {
        self.inner.graph.lock().node_count()
    }

    /// Run `f` without recording any reads it makes as dependencies.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _ctx = ReactiveContext::untracked(self);
        f()
    }

    /// Run `f` as a single batch.
    ///
    /// Staleness from every write inside `f` is propagated as the writes
    /// happen, but effects run only once the outermost batch closes, each at
    /// most once.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.begin_batch();
        f()
    }

    /// Run every queued effect whose dependencies changed.
    ///
    /// Called automatically at the end of each outermost batch. A no-op while
    /// a batch is open or a flush is already in progress.
    pub fn flush(&self) {
        {
            let mut batch = self.inner.batch.lock();
            if batch.flushing || batch.depth > 0 {
                return;
            }
            batch.flushing = true;
        }
        let _flushing = FlushGuard { runtime: self };

        let mut rounds = 0;
        loop {
            let mut pending: Vec<NodeId> = self.inner.batch.lock().pending.drain(..).collect();
            if pending.is_empty() {
                break;
            }

            rounds += 1;
            if rounds > self.inner.config.max_flush_rounds {
                warn!(
                    rounds,
                    dropped = pending.len(),
                    "effects kept rescheduling each other; abandoning flush"
                );
                break;
            }

            // IDs are allocated in creation order.
            pending.sort_unstable();
            for id in pending {
                let Some(effect) = self.lookup(id) else {
                    trace!(node = %id, "dropping run for unregistered effect");
                    continue;
                };
                if let Err(err) = effect.refresh() {
                    error!(node = %id, %err, "effect evaluation failed");
                    panic!("{err}");
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Crate-internal graph plumbing
    // ------------------------------------------------------------------------

    pub(crate) fn with_stack<R>(&self, f: impl FnOnce(&mut TrackingStack) -> R) -> R {
        f(&mut self.inner.stack.lock())
    }

    /// Allocate a node of the given kind.
    pub(crate) fn add_node(&self, kind: NodeKind) -> NodeId {
        self.inner
            .graph
            .lock()
            .add_node(NodeId::new(), kind, Epoch::current())
    }

    /// Make a derived value or effect reachable for refreshes.
    pub(crate) fn register(&self, id: NodeId, reactive: Weak<dyn Reactive>) {
        self.inner.registry.lock().insert(id, reactive);
    }

    /// Remove a node and discard any pending run for it.
    pub(crate) fn release(&self, id: NodeId) {
        self.inner.registry.lock().remove(&id);
        self.inner.graph.lock().remove_node(id);
        self.inner.batch.lock().pending.shift_remove(&id);
    }

    fn lookup(&self, id: NodeId) -> Option<Arc<dyn Reactive>> {
        self.inner.registry.lock().get(&id).and_then(Weak::upgrade)
    }

    /// Record a read of `id` into the active frame, if any.
    pub(crate) fn track(&self, id: NodeId) {
        self.with_stack(|stack| stack.track(id));
    }

    /// Fail if `id` is already being evaluated further up the stack.
    pub(crate) fn check_cycle(&self, id: NodeId) -> Result<()> {
        let cyclic = self.with_stack(|stack| {
            let cyclic = stack.is_evaluating(id);
            if cyclic {
                stack.poison(id);
            }
            cyclic
        });

        if cyclic {
            error!(node = %id, "cyclic dependency detected");
            return Err(GraphError::CyclicDependency { node: id });
        }
        Ok(())
    }

    pub(crate) fn dirty_state(&self, id: NodeId) -> DirtyState {
        self.inner
            .graph
            .lock()
            .dirty_state(id)
            .unwrap_or(DirtyState::Dirty)
    }

    pub(crate) fn changed_at(&self, id: NodeId) -> Option<Epoch> {
        self.inner.graph.lock().changed_at(id)
    }

    /// Record a committed write to a source node.
    pub(crate) fn write(&self, id: NodeId) {
        let _guard = self.begin_batch();

        let epoch = Epoch::advance();
        let effects = self.inner.graph.lock().mark_changed(id, epoch);
        trace!(node = %id, %epoch, effects = effects.len(), "signal written");

        if !effects.is_empty() {
            self.inner.batch.lock().pending.extend(effects);
        }
    }

    /// Whether any direct dependency of `id` changed value since `id` was
    /// last verified. Dependencies are brought up to date in read order and
    /// the walk stops at the first change.
    pub(crate) fn dependencies_changed(&self, id: NodeId) -> Result<bool> {
        let Some((dependencies, verified_at)) = self.inner.graph.lock().verification_inputs(id)
        else {
            return Ok(true);
        };

        for dependency in dependencies {
            if let Some(reactive) = self.lookup(dependency) {
                reactive.refresh()?;
            }
            match self.changed_at(dependency) {
                Some(changed_at) if changed_at <= verified_at => {}
                _ => {
                    trace!(node = %id, %dependency, "dependency changed");
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Run `f` inside a tracking frame for `id` and install the dependencies
    /// it read. A cycle detected anywhere inside `f` fails the evaluation.
    pub(crate) fn evaluate<T>(&self, id: NodeId, f: impl FnOnce() -> T) -> Result<T> {
        let ctx = ReactiveContext::enter(self, id);
        let value = f();
        let frame = ctx.exit();

        let mut graph = self.inner.graph.lock();
        if let Some(node) = frame.cycle {
            graph.mark_dirty(id);
            return Err(GraphError::CyclicDependency { node });
        }
        graph.replace_dependencies(id, frame.dependencies);
        Ok(value)
    }

    pub(crate) fn mark_verified(&self, id: NodeId, epoch: Epoch, changed: bool) {
        self.inner.graph.lock().mark_verified(id, epoch, changed);
    }

    fn begin_batch(&self) -> BatchGuard<'_> {
        self.inner.batch.lock().depth += 1;
        BatchGuard { runtime: self }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("node_count", &self.node_count())
            .field("config", &self.inner.config)
            .finish()
    }
}

struct BatchGuard<'a> {
    runtime: &'a Runtime,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        let outermost = {
            let mut batch = self.runtime.inner.batch.lock();
            batch.depth -= 1;
            batch.depth == 0
        };
        if outermost && !std::thread::panicking() {
            self.runtime.flush();
        }
    }
}

struct FlushGuard<'a> {
    runtime: &'a Runtime,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.runtime.inner.batch.lock().flushing = false;
    }
}
