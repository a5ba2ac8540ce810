//! Migration units.

use super::error::MigrationError;
use crate::storage::FieldGroupStore;
use std::fmt;

/// A single, identifiable schema change with forward and reverse steps.
///
/// Units are ordered by `id`. `down` is expected to undo exactly what `up`
/// did; the runner does not check this.
pub trait Migration: Send + Sync {
    /// Stable identifier, used for ordering and the ledger.
    fn id(&self) -> &str;

    /// Apply the change.
    fn up(&self, store: &FieldGroupStore) -> Result<(), MigrationError>;

    /// Revert the change.
    fn down(&self, store: &FieldGroupStore) -> Result<(), MigrationError>;

    /// Content checksum, if the unit's body can change after it was applied.
    fn checksum(&self) -> Option<String> {
        None
    }
}

type StepFn = Box<dyn Fn(&FieldGroupStore) -> Result<(), MigrationError> + Send + Sync>;

/// A migration defined by two closures.
pub struct FnMigration {
    id: String,
    up: StepFn,
    down: StepFn,
}

impl FnMigration {
    /// Create a migration from an `up` and a `down` closure.
    pub fn new<U, D>(id: impl Into<String>, up: U, down: D) -> Self
    where
        U: Fn(&FieldGroupStore) -> Result<(), MigrationError> + Send + Sync + 'static,
        D: Fn(&FieldGroupStore) -> Result<(), MigrationError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            up: Box::new(up),
            down: Box::new(down),
        }
    }
}

impl fmt::Debug for FnMigration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMigration").field("id", &self.id).finish()
    }
}

impl Migration for FnMigration {
    fn id(&self) -> &str {
        &self.id
    }

    fn up(&self, store: &FieldGroupStore) -> Result<(), MigrationError> {
        (self.up)(store)
    }

    fn down(&self, store: &FieldGroupStore) -> Result<(), MigrationError> {
        (self.down)(store)
    }
}
