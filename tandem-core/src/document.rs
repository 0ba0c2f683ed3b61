//! Shared Document Fields
//!
//! The transport layer that replicates document state between participants
//! is outside this crate. What we consume from it is a key/value surface of
//! JSON fields: read the current value of a field, write a new one.
//!
//! [`DocumentFields`] is the in-process implementation. Each key is backed by
//! a [`Signal`], so a derived value that reads a field is invalidated when a
//! local operation or a remote update writes it.

use dashmap::DashMap;
use serde_json::{Map, Value};
use tracing::trace;

use crate::reactive::{Runtime, Signal};

/// Read/write access to shared document fields.
pub trait SharedFields: Send + Sync {
    /// Current value of `key`, or `None` if the field is absent.
    fn read_field(&self, key: &str) -> Option<Value>;

    /// Replace the value of `key`. Assumed atomic.
    fn write_field(&self, key: &str, value: Value);
}

/// Reactive, in-memory shared fields for one document instance.
pub struct DocumentFields {
    runtime: Runtime,
    fields: DashMap<String, Signal<Option<Value>>>,
}

impl DocumentFields {
    pub fn new(runtime: &Runtime) -> Self {
        Self {
            runtime: runtime.clone(),
            fields: DashMap::new(),
        }
    }

    /// The signal backing `key`, created empty on first use so that reads of
    /// absent fields still register a dependency.
    fn cell(&self, key: &str) -> Signal<Option<Value>> {
        if let Some(cell) = self.fields.get(key) {
            return cell.clone();
        }
        self.fields
            .entry(key.to_owned())
            .or_insert_with(|| Signal::new(&self.runtime, None))
            .clone()
    }

    /// Apply an update delivered by the transport layer.
    pub fn apply_remote(&self, key: &str, value: Option<Value>) {
        trace!(key, "applying remote field update");
        self.cell(key).set(value);
    }

    /// Every present field, for handing to the transport layer.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|entry| {
                entry
                    .value()
                    .get_untracked()
                    .map(|value| (entry.key().clone(), value))
            })
            .collect()
    }
}

impl SharedFields for DocumentFields {
    fn read_field(&self, key: &str) -> Option<Value> {
        self.cell(key).get()
    }

    fn write_field(&self, key: &str, value: Value) {
        trace!(key, "writing shared field");
        self.cell(key).set(Some(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Derived;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn absent_field_reads_as_none() {
        let runtime = Runtime::new();
        let fields = DocumentFields::new(&runtime);
        assert_eq!(fields.read_field("timer"), None);
    }

    #[test]
    fn derived_value_sees_later_writes() {
        let runtime = Runtime::new();
        let fields = Arc::new(DocumentFields::new(&runtime));
        let title = Derived::new(&runtime, {
            let fields = fields.clone();
            move || fields.read_field("title")
        });

        assert_eq!(title.get(), None);
        fields.write_field("title", json!("Roadmap"));
        assert_eq!(title.get(), Some(json!("Roadmap")));

        fields.apply_remote("title", None);
        assert_eq!(title.get(), None);
    }

    #[test]
    fn snapshot_skips_absent_fields() {
        let runtime = Runtime::new();
        let fields = DocumentFields::new(&runtime);
        fields.read_field("ghost");
        fields.write_field("count", json!(3));

        let snapshot = fields.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["count"], json!(3));
    }
}
