//! Row types persisted by the storage layer.

use crate::error::Error;
use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize};

/// Copy stored bytes into a buffer rkyv can validate.
///
/// sled hands back `IVec`s with no alignment guarantee.
pub(crate) fn aligned(bytes: &[u8]) -> AlignedVec<16> {
    let mut buf = AlignedVec::<16>::new();
    buf.extend_from_slice(bytes);
    buf
}

/// A stored field value.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct ValueRow {
    /// Opaque serialized value.
    pub data: String,

    /// Last write timestamp in microseconds since Unix epoch.
    pub updated_at: u64,
}

impl ValueRow {
    /// Create a new row stamped with the current time.
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            updated_at: super::key::current_timestamp(),
        }
    }

    /// Serialize the row to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a row from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(&aligned(bytes))
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

/// Registry entry mapping a group name to its physical tables.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct GroupEntry {
    /// Internal group id.
    pub id: u64,

    /// Group name as supplied by the caller.
    pub name: String,

    /// Sanitized slug used to derive table names.
    pub slug: String,

    /// Creation timestamp in microseconds since Unix epoch.
    pub created_at: u64,
}

impl GroupEntry {
    /// Create a new registry entry.
    pub fn new(id: u64, name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            slug: slug.into(),
            created_at: super::key::current_timestamp(),
        }
    }

    /// Name of the definition table.
    pub fn fields_table(&self) -> String {
        super::naming::fields_table(&self.slug)
    }

    /// Name of the value table.
    pub fn values_table(&self) -> String {
        super::naming::values_table(&self.slug)
    }

    /// Serialize the entry to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize an entry from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(&aligned(bytes))
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_row_roundtrip() {
        let row = ValueRow::new("19.99");
        let decoded = ValueRow::from_bytes(&row.to_bytes().unwrap()).unwrap();
        assert_eq!(row, decoded);
    }

    #[test]
    fn test_group_entry_tables() {
        let entry = GroupEntry::new(7, "Hero-Banner", "hero_banner");
        assert_eq!(entry.fields_table(), "group:hero_banner:fields");
        assert_eq!(entry.values_table(), "group:hero_banner:values");

        let decoded = GroupEntry::from_bytes(&entry.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_decode_from_unaligned_slice() {
        let row = ValueRow::new("Lamp");
        let bytes = row.to_bytes().unwrap();

        // Shift the payload off its natural alignment, as sled's IVec may.
        let mut shifted = vec![0u8; bytes.len() + 1];
        shifted[1..].copy_from_slice(&bytes);
        assert_eq!(ValueRow::from_bytes(&shifted[1..]).unwrap(), row);

        let entry = GroupEntry::new(3, "products", "products");
        let bytes = entry.to_bytes().unwrap();
        let mut shifted = vec![0u8; bytes.len() + 3];
        shifted[3..].copy_from_slice(&bytes);
        assert_eq!(GroupEntry::from_bytes(&shifted[3..]).unwrap(), entry);
    }
}
