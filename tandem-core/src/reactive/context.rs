//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! we can register the current computation as a dependent.
//!
//! # Implementation
//!
//! Each [`Runtime`] owns its own stack of frames. When a derived value or
//! effect is evaluated we push a frame for it, and every read made while the
//! frame is on top is recorded into it. When the computation completes, the
//! frame is popped and its dependency list becomes the node's new edge set.
//!
//! Because the stack belongs to the runtime rather than to the thread, two
//! document instances evaluated side by side never see each other's frames.
//!
//! Nested frames support derived values that read other derived values, and
//! the stack doubles as the cycle detector: a node that finds its own frame
//! already on the stack has been re-entered.

use super::runtime::Runtime;
use crate::graph::{Dependencies, NodeId};

/// An entry in the reactive context stack.
#[derive(Debug, Default)]
pub(crate) struct Frame {
    /// The node being evaluated, or `None` for an untracked scope.
    pub(crate) owner: Option<NodeId>,
    /// Dependencies collected during this computation, in read order.
    pub(crate) dependencies: Dependencies,
    /// Set when a cycle passing through this frame was detected.
    pub(crate) cycle: Option<NodeId>,
}

/// The per-runtime stack of active frames.
#[derive(Debug, Default)]
pub(crate) struct TrackingStack {
    frames: Vec<Frame>,
}

impl TrackingStack {
    fn push(&mut self, owner: Option<NodeId>) {
        self.frames.push(Frame {
            owner,
            ..Frame::default()
        });
    }

    fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    /// Whether reads are currently being recorded.
    pub(crate) fn is_active(&self) -> bool {
        self.frames.last().is_some_and(|frame| frame.owner.is_some())
    }

    /// The node whose evaluation is on top of the stack, if any.
    pub(crate) fn current(&self) -> Option<NodeId> {
        self.frames.last().and_then(|frame| frame.owner)
    }

    /// Record a read of `node` into the top frame.
    pub(crate) fn track(&mut self, node: NodeId) {
        if let Some(frame) = self.frames.last_mut() {
            if frame.owner.is_some() && !frame.dependencies.contains(&node) {
                frame.dependencies.push(node);
            }
        }
    }

    /// Whether `node` is somewhere on the stack.
    pub(crate) fn is_evaluating(&self, node: NodeId) -> bool {
        self.frames.iter().any(|frame| frame.owner == Some(node))
    }

    /// Poison every frame from `node`'s frame to the top of the stack, so
    /// that each evaluation caught in the cycle fails instead of caching.
    pub(crate) fn poison(&mut self, node: NodeId) {
        if let Some(start) = self.frames.iter().position(|frame| frame.owner == Some(node)) {
            for frame in &mut self.frames[start..] {
                frame.cycle.get_or_insert(node);
            }
        }
    }
}

/// Guard that pops its frame when dropped.
///
/// This keeps the stack consistent even if a computation panics.
pub(crate) struct ReactiveContext {
    runtime: Runtime,
    owner: Option<NodeId>,
    exited: bool,
}

impl ReactiveContext {
    /// Enter a tracking frame for `owner`.
    pub(crate) fn enter(runtime: &Runtime, owner: NodeId) -> Self {
        Self::push(runtime, Some(owner))
    }

    /// Enter a frame in which reads are not recorded.
    pub(crate) fn untracked(runtime: &Runtime) -> Self {
        Self::push(runtime, None)
    }

    fn push(runtime: &Runtime, owner: Option<NodeId>) -> Self {
        runtime.with_stack(|stack| stack.push(owner));
        Self {
            runtime: runtime.clone(),
            owner,
            exited: false,
        }
    }

    /// Leave the frame and hand back what it collected.
    pub(crate) fn exit(mut self) -> Frame {
        self.exited = true;
        self.pop().unwrap_or_default()
    }

    fn pop(&self) -> Option<Frame> {
        let popped = self.runtime.with_stack(TrackingStack::pop);

        // Verify we're popping the right context.
        if let Some(frame) = &popped {
            debug_assert_eq!(
                frame.owner, self.owner,
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.owner, frame.owner
            );
        }
        popped
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        if !self.exited {
            self.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_owner() {
        let runtime = Runtime::new();
        let id = NodeId::new();

        assert!(!runtime.is_tracking());
        {
            let _ctx = ReactiveContext::enter(&runtime, id);
            assert!(runtime.is_tracking());
            assert_eq!(runtime.with_stack(|s| s.current()), Some(id));
        }

        // Context should be cleaned up after drop
        assert!(!runtime.is_tracking());
    }

    #[test]
    fn context_collects_dependencies_once() {
        let runtime = Runtime::new();
        let ctx = ReactiveContext::enter(&runtime, NodeId::new());
        let (a, b) = (NodeId::new(), NodeId::new());

        runtime.with_stack(|s| {
            s.track(a);
            s.track(b);
            s.track(a);
        });

        let frame = ctx.exit();
        assert_eq!(frame.dependencies.as_slice(), &[a, b]);
    }

    #[test]
    fn untracked_frame_records_nothing() {
        let runtime = Runtime::new();
        let outer = ReactiveContext::enter(&runtime, NodeId::new());
        {
            let _quiet = ReactiveContext::untracked(&runtime);
            assert!(!runtime.is_tracking());
            runtime.with_stack(|s| s.track(NodeId::new()));
        }
        assert!(outer.exit().dependencies.is_empty());
    }

    #[test]
    fn runtimes_do_not_share_frames() {
        let first = Runtime::new();
        let second = Runtime::new();
        let _ctx = ReactiveContext::enter(&first, NodeId::new());

        assert!(first.is_tracking());
        assert!(!second.is_tracking());
    }

    #[test]
    fn poison_marks_frames_above_the_cycle_start() {
        let runtime = Runtime::new();
        let (a, b) = (NodeId::new(), NodeId::new());
        let outer = ReactiveContext::enter(&runtime, a);
        let inner = ReactiveContext::enter(&runtime, b);

        runtime.with_stack(|s| {
            assert!(s.is_evaluating(a));
            s.poison(a);
        });

        assert_eq!(inner.exit().cycle, Some(a));
        assert_eq!(outer.exit().cycle, Some(a));
    }
}
