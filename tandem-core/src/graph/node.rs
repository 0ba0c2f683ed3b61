//! Graph Nodes
//!
//! This module defines the node metadata that lives in the dependency graph.
//! Values themselves are stored in the typed handles (`Signal`, `Derived`);
//! the graph only knows ids, edges, and epochs.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;
use smallvec::SmallVec;

use super::epoch::Epoch;

/// Unique identifier for a node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    ///
    /// IDs are handed out in creation order, which doubles as the
    /// registration order used when running effects.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A source node (signal). These are the roots of the graph.
    /// They have no dependencies, only dependents.
    Source,

    /// A derived node. These have dependencies and may have dependents.
    /// They cache their computed value.
    Derived,

    /// An effect node. These are leaves of the graph.
    /// They have dependencies but no dependents.
    Effect,
}

/// Dirty state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyState {
    /// The node's value is up-to-date.
    Clean,

    /// One of the node's transitive inputs was written, but we have not yet
    /// verified whether any direct dependency actually changed value.
    MaybeDirty,

    /// The node must recompute (never evaluated, or its last evaluation
    /// failed).
    Dirty,
}

/// Dependency list type. Most derivations read only a handful of inputs.
pub type Dependencies = SmallVec<[NodeId; 4]>;

/// A node in the dependency graph.
#[derive(Debug)]
pub struct Node {
    /// Unique identifier for this node.
    id: NodeId,

    /// What kind of node this is.
    kind: NodeKind,

    /// Current dirty state.
    dirty: DirtyState,

    /// Epoch at which this node's value last changed.
    changed_at: Epoch,

    /// Epoch at which this node was last evaluated or verified clean.
    verified_at: Epoch,

    /// Nodes this node read during its last evaluation, in read order.
    dependencies: Dependencies,

    /// Nodes that read this node during their last evaluation.
    dependents: IndexSet<NodeId>,
}

impl Node {
    /// Create a new node with the given kind, stamped at `epoch`.
    pub fn new(id: NodeId, kind: NodeKind, epoch: Epoch) -> Self {
        Self {
            id,
            kind,
            dirty: match kind {
                NodeKind::Source => DirtyState::Clean,
                // Start dirty to ensure first computation
                NodeKind::Derived | NodeKind::Effect => DirtyState::Dirty,
            },
            changed_at: epoch,
            verified_at: epoch,
            dependencies: Dependencies::new(),
            dependents: IndexSet::new(),
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the node's kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Get the current dirty state.
    pub fn dirty_state(&self) -> DirtyState {
        self.dirty
    }

    /// Check if the node needs any processing.
    pub fn is_clean(&self) -> bool {
        self.dirty == DirtyState::Clean
    }

    pub fn changed_at(&self) -> Epoch {
        self.changed_at
    }

    pub fn verified_at(&self) -> Epoch {
        self.verified_at
    }

    /// Mark the node clean as of `epoch`, optionally recording a value change.
    pub fn mark_verified(&mut self, epoch: Epoch, changed: bool) {
        self.dirty = DirtyState::Clean;
        self.verified_at = epoch;
        if changed {
            self.changed_at = epoch;
        }
    }

    /// Record a write to a source node.
    pub fn mark_written(&mut self, epoch: Epoch) {
        self.changed_at = epoch;
        self.verified_at = epoch;
    }

    /// Mark the node as maybe dirty (a dependency might have changed).
    pub fn mark_maybe_dirty(&mut self) {
        if self.dirty == DirtyState::Clean {
            self.dirty = DirtyState::MaybeDirty;
        }
    }

    /// Mark the node as definitely dirty (needs recomputation).
    pub fn mark_dirty(&mut self) {
        self.dirty = DirtyState::Dirty;
    }

    /// Get all dependencies, in the order they were read.
    pub fn dependencies(&self) -> &[NodeId] {
        &self.dependencies
    }

    pub(crate) fn set_dependencies(&mut self, dependencies: Dependencies) {
        self.dependencies = dependencies;
    }

    /// Add a dependent (a node that reads from this node).
    pub fn add_dependent(&mut self, node_id: NodeId) {
        self.dependents.insert(node_id);
    }

    /// Remove a dependent.
    pub fn remove_dependent(&mut self, node_id: NodeId) {
        self.dependents.shift_remove(&node_id);
    }

    /// Get all dependents.
    pub fn dependents(&self) -> &IndexSet<NodeId> {
        &self.dependents
    }
}
