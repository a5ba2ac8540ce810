//! Migration ledger - durable record of executed migrations.
//!
//! Each executed migration is one row keyed by a monotonically increasing
//! sequence number, so a scan yields entries in execution order.

use super::error::MigrationError;
use crate::storage::key::current_timestamp;
use crate::storage::StorageEngine;
use rkyv::{Archive, Deserialize, Serialize};
use std::sync::Arc;

/// A single executed migration.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Sequence number; also the row key.
    pub sequence: u64,
    /// Migration identifier.
    pub id: String,
    /// Batch the migration was applied in.
    pub batch: u64,
    /// When the migration was applied (microseconds since epoch).
    pub executed_at: u64,
    /// Content checksum at execution time, for units that have one.
    pub checksum: Option<String>,
}

impl LedgerEntry {
    /// Serialize the entry to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MigrationError> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| MigrationError::Serialization(e.to_string()))
    }

    /// Deserialize an entry from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MigrationError> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(&crate::storage::aligned(bytes))
            .map_err(|e| MigrationError::Deserialization(e.to_string()))
    }
}

/// Persistent store of executed migrations.
#[derive(Clone)]
pub struct MigrationLedger {
    engine: Arc<StorageEngine>,
    tree: sled::Tree,
}

impl MigrationLedger {
    /// Tree name for the ledger.
    pub const TREE_NAME: &'static str = "migration:ledger";

    /// Open the ledger, creating its table if absent.
    pub fn open(engine: Arc<StorageEngine>) -> Result<Self, MigrationError> {
        let tree = engine.open_table(Self::TREE_NAME)?;
        Ok(Self { engine, tree })
    }

    /// Record a migration as executed in `batch`.
    pub fn record(
        &self,
        id: &str,
        batch: u64,
        checksum: Option<String>,
    ) -> Result<LedgerEntry, MigrationError> {
        let entry = LedgerEntry {
            sequence: self.engine.generate_id()?,
            id: id.to_string(),
            batch,
            executed_at: current_timestamp(),
            checksum,
        };
        self.tree
            .insert(entry.sequence.to_be_bytes(), entry.to_bytes()?)?;
        self.tree.flush()?;
        Ok(entry)
    }

    /// Remove an entry. Returns `false` if it was already gone.
    pub fn remove(&self, entry: &LedgerEntry) -> Result<bool, MigrationError> {
        let removed = self.tree.remove(entry.sequence.to_be_bytes())?.is_some();
        self.tree.flush()?;
        Ok(removed)
    }

    /// All entries in execution order.
    pub fn entries(&self) -> Result<Vec<LedgerEntry>, MigrationError> {
        self.tree
            .iter()
            .values()
            .map(|value| LedgerEntry::from_bytes(&value?))
            .collect()
    }

    /// Look up the entry for a migration id.
    pub fn find(&self, id: &str) -> Result<Option<LedgerEntry>, MigrationError> {
        Ok(self.entries()?.into_iter().find(|entry| entry.id == id))
    }

    /// Entries of one batch in execution order.
    pub fn batch(&self, batch: u64) -> Result<Vec<LedgerEntry>, MigrationError> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|entry| entry.batch == batch)
            .collect())
    }

    /// Highest batch number recorded, if any.
    pub fn max_batch(&self) -> Result<Option<u64>, MigrationError> {
        Ok(self.entries()?.iter().map(|entry| entry.batch).max())
    }

    /// Number of recorded migrations.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Check whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Remove every entry.
    pub fn clear(&self) -> Result<(), MigrationError> {
        self.tree.clear()?;
        self.tree.flush()?;
        Ok(())
    }
}
