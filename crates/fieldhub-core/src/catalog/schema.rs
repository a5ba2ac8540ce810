//! Schema snapshot - point-in-time view of every group and its fields.

use super::FieldDefinition;
use crate::error::Error;
use std::collections::BTreeMap;

/// A point-in-time snapshot of the whole schema.
///
/// Used by exporters/importers; serialized as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct SchemaSnapshot {
    /// Snapshot timestamp (microseconds since Unix epoch).
    pub taken_at: u64,
    /// Field definitions per group, each list ordered by `order`.
    pub groups: BTreeMap<String, Vec<FieldDefinition>>,
}

impl SchemaSnapshot {
    /// Create an empty snapshot stamped with the current time.
    pub fn new() -> Self {
        Self {
            taken_at: crate::storage::key::current_timestamp(),
            groups: BTreeMap::new(),
        }
    }

    /// Add a group to the snapshot.
    pub fn with_group(mut self, name: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        self.groups.insert(name.into(), fields);
        self
    }

    /// Fields of a group.
    pub fn group(&self, name: &str) -> Option<&[FieldDefinition]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    /// Group names, sorted.
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.keys().map(String::as_str).collect()
    }

    /// Check whether two snapshots describe the same schema, ignoring time.
    pub fn same_schema(&self, other: &SchemaSnapshot) -> bool {
        self.groups == other.groups
    }

    /// Serialize the snapshot to JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))
    }
}
