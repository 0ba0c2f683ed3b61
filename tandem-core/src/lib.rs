//! Tandem Core
//!
//! This crate provides the state layer behind the Tandem collaborative
//! editor. It implements:
//!
//! - Reactive primitives (signals, derived values, effects, subscribers)
//! - Effective user preferences resolved from several overlapping sources
//! - A shared countdown timer synchronized to a server clock
//!
//! Rendering, authentication, and the transport that replicates document
//! state between participants live elsewhere. This crate only consumes a
//! key/value view of shared document fields ([`document::SharedFields`]).
//!
//! # Architecture
//!
//! - `graph`: node bookkeeping, epochs, and staleness propagation
//! - `reactive`: the runtime and the primitives built on it
//! - `document`: shared document fields as reactive cells
//! - `preferences`: the effective preferences resolver
//! - `timer`: the timer state machine and server clocks
//! - `config`: configuration loaded from JSON
//!
//! # Example
//!
//! ```rust
//! use tandem_core::reactive::{Derived, Runtime, Signal, Subscriber};
//! use std::sync::{Arc, Mutex};
//!
//! let runtime = Runtime::new();
//! let count = Signal::new(&runtime, 1);
//! let doubled = Derived::new(&runtime, {
//!     let count = count.clone();
//!     move || count.get() * 2
//! });
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let _subscription = Subscriber::register(
//!     &runtime,
//!     {
//!         let doubled = doubled.clone();
//!         move || doubled.get()
//!     },
//!     {
//!         let seen = seen.clone();
//!         move |value| seen.lock().unwrap().push(value)
//!     },
//! );
//!
//! count.set(5);
//! assert_eq!(*seen.lock().unwrap(), vec![10]);
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod graph;
pub mod preferences;
pub mod reactive;
pub mod timer;

pub use config::Config;
pub use error::{ConfigError, GraphError, InvalidTransition};
