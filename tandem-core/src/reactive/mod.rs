//! Reactive Primitives
//!
//! This module implements the reactive graph: signals, derived values,
//! effects, and subscribers. Everything built on top (effective preferences,
//! timer state) is expressed in these terms.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (a derived value or effect), the read is
//! recorded as a dependency. When the signal is written with a different
//! value, every dependent is marked stale.
//!
//! ## Derived Values
//!
//! A Derived value caches the result of a computation. It re-evaluates only
//! when it is read and one of its inputs changed. A derived value nobody
//! reads is never evaluated, no matter how often its inputs are written.
//!
//! ## Effects and Subscribers
//!
//! An Effect is a side-effecting computation that re-runs after a batch of
//! writes changed one of its inputs. A Subscriber is an effect split into a
//! tracked dependency function and an untracked callback.
//!
//! # Implementation Notes
//!
//! Each [`Runtime`] owns its tracking stack. A node being evaluated pushes a
//! frame; reads land in the top frame; the frame becomes the node's new
//! dependency set when it is popped. Nothing here is process-global except
//! the epoch counter, so separate runtimes never observe each other.

mod context;
mod derived;
mod effect;
mod runtime;
mod signal;
mod subscriber;

pub use derived::Derived;
pub use effect::Effect;
pub use runtime::{Reactive, Runtime};
pub use signal::Signal;
pub use subscriber::{Subscriber, Subscription};
