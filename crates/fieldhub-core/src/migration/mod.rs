//! Schema migrations for field groups.
//!
//! Migration units are discovered from a [`MigrationSource`], ordered by id
//! and applied in batches by the [`MigrationRunner`]. Executed units are
//! recorded in the [`MigrationLedger`] so a batch can be rolled back later.

mod error;
mod ledger;
mod ops;
mod runner;
mod source;
mod unit;

pub use error::MigrationError;
pub use ledger::{LedgerEntry, MigrationLedger};
pub use ops::{ManifestMigration, SchemaOp};
pub use runner::{
    Direction, MigrationBatchResult, MigrationOutcome, MigrationRunner, MigrationStatusEntry,
    OutcomeStatus,
};
pub use source::{ManifestDirectory, MigrationSource, MigrationSet};
pub use unit::{FnMigration, Migration};
