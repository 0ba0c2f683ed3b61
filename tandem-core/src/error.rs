//! Error types for the Tandem core runtime.

use thiserror::Error;

use crate::graph::NodeId;
use crate::timer::{TimerOperation, TimerStatus};

/// Errors raised while evaluating the reactive graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A derived value read itself, directly or through other derived values,
    /// while it was being evaluated. This is a defect in the graph's
    /// construction, not a runtime condition.
    #[error("cyclic dependency detected: {node} was read during its own evaluation")]
    CyclicDependency { node: NodeId },
}

/// A timer operation that is not legal in the timer's current state.
///
/// The [`Timer`](crate::timer::Timer) machine swallows these: they arise
/// routinely from stale controls while another participant is editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {operation} a timer that is {state}")]
pub struct InvalidTransition {
    pub operation: TimerOperation,
    pub state: TimerStatus,
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Result type for graph evaluation.
pub type Result<T, E = GraphError> = std::result::Result<T, E>;
