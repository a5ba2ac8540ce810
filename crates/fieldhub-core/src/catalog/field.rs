//! Field definitions within a group.

use super::types::FieldType;
use crate::error::Error;
use rkyv::{Archive, Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a field definition.
///
/// Survives renames; never reused within a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Archive, Serialize, Deserialize)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub u64);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A field definition within a group.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct FieldDefinition {
    /// Field id.
    pub id: FieldId,
    /// Field name, unique within the group.
    pub name: String,
    /// Field data type.
    pub field_type: FieldType,
    /// Display/processing position. Need not be contiguous.
    pub order: i64,
}

impl FieldDefinition {
    /// Create a new field definition.
    pub fn new(id: FieldId, name: impl Into<String>, field_type: FieldType, order: i64) -> Self {
        Self {
            id,
            name: name.into(),
            field_type,
            order,
        }
    }

    /// Serialize the definition to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a definition from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(&crate::storage::aligned(bytes))
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

/// Sort definitions by `order`, breaking ties by name.
pub fn sort_definitions(fields: &mut [FieldDefinition]) {
    fields.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
}
