//! Key encoding for field value tables.

use std::fmt;

/// Separator between the field name and the record id.
const SEPARATOR: u8 = 0;

/// Size of the record id suffix in bytes.
pub const RECORD_ID_SIZE: usize = 8;

/// Key of a single field value row.
///
/// Key format: `[field_name bytes][0x00][record_id (8 bytes, big-endian)]`
///
/// Field names never contain NUL, so every value of one field shares the
/// prefix `field_name 0x00` and rename/remove become prefix scans.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ValueKey {
    /// Field name within the group.
    pub field: String,

    /// Owning content record.
    pub record_id: u64,
}

impl ValueKey {
    /// Create a new value key.
    pub fn new(field: impl Into<String>, record_id: u64) -> Self {
        Self {
            field: field.into(),
            record_id,
        }
    }

    /// Encode the key to bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Self::field_prefix(&self.field);
        buf.extend_from_slice(&self.record_id.to_be_bytes());
        buf
    }

    /// Decode a key from bytes.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < RECORD_ID_SIZE + 1 {
            return None;
        }
        let split = bytes.len() - RECORD_ID_SIZE;
        if bytes[split - 1] != SEPARATOR {
            return None;
        }

        let field = std::str::from_utf8(&bytes[..split - 1]).ok()?;
        let mut id_bytes = [0u8; RECORD_ID_SIZE];
        id_bytes.copy_from_slice(&bytes[split..]);

        Some(Self {
            field: field.to_string(),
            record_id: u64::from_be_bytes(id_bytes),
        })
    }

    /// Prefix shared by every value of a field.
    pub fn field_prefix(field: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(field.len() + 1 + RECORD_ID_SIZE);
        prefix.extend_from_slice(field.as_bytes());
        prefix.push(SEPARATOR);
        prefix
    }
}

impl fmt::Debug for ValueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueKey({}#{})", self.field, self.record_id)
    }
}

/// Get current timestamp in microseconds since Unix epoch.
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
