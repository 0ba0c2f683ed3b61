//! Timer State Machine
//!
//! [`Timer`] binds the pure transitions in [`TimerProps`] to a shared
//! document field and a server clock. Reads go through a derived value, so
//! anything computed from the timer is invalidated when a participant writes
//! the field. Every operation performs exactly one field write, or none when
//! the operation is not legal in the current state.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use super::clock::ServerClock;
use super::props::{ServerTimestamp, TimerProps, TimerStatus};
use crate::config::TimerConfig;
use crate::document::SharedFields;
use crate::error::InvalidTransition;
use crate::reactive::{Derived, Runtime};

/// A countdown timer shared by every participant of a document.
pub struct Timer {
    runtime: Runtime,
    fields: Arc<dyn SharedFields>,
    clock: Arc<dyn ServerClock>,
    key: String,
    props: Derived<Option<TimerProps>>,
}

impl Timer {
    pub fn new(
        runtime: &Runtime,
        fields: Arc<dyn SharedFields>,
        clock: Arc<dyn ServerClock>,
        config: &TimerConfig,
    ) -> Self {
        let key = config.field_key.clone();
        let props = Derived::new(runtime, {
            let fields = Arc::clone(&fields);
            let key = key.clone();
            move || {
                let value = fields.read_field(&key)?;
                match serde_json::from_value::<TimerProps>(value) {
                    Ok(props) => Some(props),
                    Err(err) => {
                        warn!(key = %key, %err, "malformed timer field, treating as absent");
                        None
                    }
                }
            }
        });

        Self {
            runtime: runtime.clone(),
            fields,
            clock,
            key,
            props,
        }
    }

    /// The shared document field holding this timer.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The current props, or `None` if the document has no timer.
    pub fn props(&self) -> Option<TimerProps> {
        self.props.get()
    }

    /// The derived value behind [`props`](Self::props).
    pub fn props_derived(&self) -> &Derived<Option<TimerProps>> {
        &self.props
    }

    pub fn status(&self) -> Option<TimerStatus> {
        self.props().map(|props| props.status())
    }

    /// Server time now.
    pub fn server_now(&self) -> ServerTimestamp {
        self.clock.now()
    }

    /// Time left as of the server's now.
    pub fn remaining_time(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.props().map(|props| props.remaining_at(now))
    }

    pub fn can_increase(&self) -> bool {
        self.props().is_some_and(|props| props.can_increase())
    }

    pub fn can_decrease(&self) -> bool {
        self.props().is_some_and(|props| props.can_decrease())
    }

    /// Put a stopped timer of `initial_time` into the document, unless one is
    /// already there. Returns whether a timer was written.
    pub fn create(&self, initial_time: Duration) -> bool {
        if self.current().is_some() {
            debug!(key = %self.key, "timer already exists");
            return false;
        }
        self.write(&TimerProps::new(initial_time))
    }

    pub fn reset(&self) {
        self.apply(|props, _| Ok(props.reset()));
    }

    pub fn play(&self) {
        self.apply(|props, now| props.play(now));
    }

    pub fn pause(&self) {
        self.apply(|props, now| props.pause(now));
    }

    pub fn increase(&self) {
        self.apply(|props, _| props.increase());
    }

    pub fn decrease(&self) {
        self.apply(|props, _| props.decrease());
    }

    /// Move a running timer whose countdown has run out to completed.
    /// Returns whether it did.
    pub fn complete_if_elapsed(&self) -> bool {
        let Some(props) = self.current() else {
            return false;
        };
        match props.complete(self.clock.now()) {
            Ok(next) => self.write(&next),
            Err(_) => false,
        }
    }

    fn current(&self) -> Option<TimerProps> {
        self.runtime.untracked(|| self.props.get())
    }

    fn apply<F>(&self, transition: F) -> bool
    where
        F: FnOnce(&TimerProps, ServerTimestamp) -> Result<TimerProps, InvalidTransition>,
    {
        let Some(props) = self.current() else {
            debug!(key = %self.key, "no timer in document");
            return false;
        };
        match transition(&props, self.clock.now()) {
            Ok(next) => self.write(&next),
            Err(err) => {
                debug!(key = %self.key, %err, "ignoring timer operation");
                false
            }
        }
    }

    fn write(&self, props: &TimerProps) -> bool {
        match serde_json::to_value(props) {
            Ok(value) => {
                self.fields.write_field(&self.key, value);
                true
            }
            Err(err) => {
                error!(key = %self.key, %err, "failed to encode timer");
                false
            }
        }
    }
}
