//! Dependency Graph
//!
//! This module implements the bookkeeping side of the reactive system: node
//! identities, the edges between them, and the epochs that tell us whether a
//! cached value can still be trusted.
//!
//! # Overview
//!
//! The dependency graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes represent reactive values (signals) or computations (derived
//!   values, effects)
//! - Edges represent dependencies: if A reads B, there is an edge from B to A
//!
//! When a signal changes, we traverse the graph to find all affected nodes
//! and mark them as maybe dirty. Recomputation is pull-based: a dirty node is
//! only re-evaluated when something reads it.
//!
//! # Design Decisions
//!
//! 1. One graph per runtime rather than per-signal subscriber lists, so that
//!    independent document instances never share state.
//!
//! 2. The graph is indexed by node ID for O(1) lookups.
//!
//! 3. We maintain both forward (dependencies) and reverse (dependents) edges
//!    to enable efficient traversal in both directions.

mod epoch;
mod node;
mod scheduler;

pub use epoch::Epoch;
pub use node::{Dependencies, DirtyState, Node, NodeId, NodeKind};
pub use scheduler::UpdateScheduler;
