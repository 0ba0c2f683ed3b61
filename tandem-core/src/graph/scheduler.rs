//! Update Scheduler
//!
//! The scheduler owns node metadata and the edges between nodes. It answers
//! two questions for the runtime:
//!
//! 1. Which nodes become stale when a source is written? We walk dependents
//!    breadth-first and mark each one "maybe dirty". Nothing is recomputed
//!    here; derived values are pulled lazily on their next read.
//! 2. Which effects were reached by that walk? Those are handed back so the
//!    runtime can queue them for the end of the batch.
//!
//! Edges are rewritten wholesale after every evaluation, because a
//! computation with conditional logic may read different inputs each time.

use std::collections::{HashMap, HashSet, VecDeque};

use super::epoch::Epoch;
use super::node::{Dependencies, DirtyState, Node, NodeId, NodeKind};

/// The update scheduler manages the dependency graph.
pub struct UpdateScheduler {
    /// All nodes in the graph, indexed by ID.
    nodes: HashMap<NodeId, Node>,
}

impl UpdateScheduler {
    /// Create a new empty scheduler.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Add a node to the graph.
    pub fn add_node(&mut self, id: NodeId, kind: NodeKind, epoch: Epoch) -> NodeId {
        self.nodes.insert(id, Node::new(id, kind, epoch));
        id
    }

    /// Remove a node from the graph.
    ///
    /// Also removes all edges involving this node.
    pub fn remove_node(&mut self, node_id: NodeId) {
        if let Some(node) = self.nodes.remove(&node_id) {
            // Remove this node from its dependencies' dependent lists
            for dep_id in node.dependencies() {
                if let Some(dep) = self.nodes.get_mut(dep_id) {
                    dep.remove_dependent(node_id);
                }
            }

            // Dependents keep the stale id in their dependency list; it is
            // skipped during verification and dropped on their next evaluation.
            for dependent_id in node.dependents() {
                if let Some(dependent) = self.nodes.get_mut(dependent_id) {
                    dependent.mark_dirty();
                }
            }
        }
    }

    /// Get a reference to a node.
    pub fn get_node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Replace the dependencies of `dependent` with exactly `dependencies`.
    ///
    /// Edges to inputs that were not read this time are dropped; new inputs
    /// gain a reverse edge.
    pub fn replace_dependencies(&mut self, dependent: NodeId, dependencies: Dependencies) {
        let previous = match self.nodes.get(&dependent) {
            Some(node) => Dependencies::from_slice(node.dependencies()),
            None => return,
        };

        for old in previous.iter().filter(|id| !dependencies.contains(id)) {
            if let Some(node) = self.nodes.get_mut(old) {
                node.remove_dependent(dependent);
            }
        }
        for new in &dependencies {
            if let Some(node) = self.nodes.get_mut(new) {
                node.add_dependent(dependent);
            }
        }
        if let Some(node) = self.nodes.get_mut(&dependent) {
            node.set_dependencies(dependencies);
        }
    }

    /// Record a write to `source_id` at `epoch` and propagate dirty flags.
    ///
    /// Returns the effects reached by the propagation, in discovery order.
    pub fn mark_changed(&mut self, source_id: NodeId, epoch: Epoch) -> Vec<NodeId> {
        let mut effects = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        // Start with the source node's direct dependents
        if let Some(source) = self.nodes.get_mut(&source_id) {
            source.mark_written(epoch);
            queue.extend(source.dependents().iter().copied());
        }

        // BFS to propagate maybe-dirty status
        while let Some(node_id) = queue.pop_front() {
            if !visited.insert(node_id) {
                continue;
            }

            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.mark_maybe_dirty();
                if node.kind() == NodeKind::Effect {
                    effects.push(node_id);
                }

                // Propagate to dependents
                queue.extend(node.dependents().iter().copied());
            }
        }

        effects
    }

    /// Mark a node clean as of `epoch`.
    pub fn mark_verified(&mut self, node_id: NodeId, epoch: Epoch, changed: bool) {
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.mark_verified(epoch, changed);
        }
    }

    pub fn mark_dirty(&mut self, node_id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.mark_dirty();
        }
    }

    pub fn dirty_state(&self, node_id: NodeId) -> Option<DirtyState> {
        self.nodes.get(&node_id).map(Node::dirty_state)
    }

    pub fn changed_at(&self, node_id: NodeId) -> Option<Epoch> {
        self.nodes.get(&node_id).map(Node::changed_at)
    }

    /// Snapshot of a node's dependencies and the epoch they were verified at.
    pub fn verification_inputs(&self, node_id: NodeId) -> Option<(Dependencies, Epoch)> {
        self.nodes
            .get(&node_id)
            .map(|node| (Dependencies::from_slice(node.dependencies()), node.verified_at()))
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for UpdateScheduler {
    fn default() -> Self {
        Self::new()
    }
}
