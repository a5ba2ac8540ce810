//! FieldHub Core - field groups, schema catalog, migrations and location rules.
//!
//! This crate provides the storage and decision logic behind user-defined
//! field groups: typed fields attached to records, versioned schema
//! migrations, and the rules that decide where each group shows up.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod catalog;
pub mod error;
pub mod hub;
pub mod location;
pub mod migration;
pub mod storage;

pub use catalog::{
    FieldDefinition, FieldId, FieldType, FieldTypeRegistry, FieldTypeSpec, SchemaCatalog,
    SchemaSnapshot, StorageRepr,
};
pub use error::{Error, ErrorKind, Result};
pub use hub::{FieldHub, FieldHubConfig};
pub use location::{
    ContextValue, LocationContext, LocationRule, LocationRuleEngine, LocationType, Operator,
    RuleStore,
};
pub use migration::{
    Direction, FnMigration, LedgerEntry, ManifestDirectory, ManifestMigration, Migration,
    MigrationBatchResult, MigrationError, MigrationLedger, MigrationOutcome, MigrationRunner,
    MigrationSet, MigrationSource, MigrationStatusEntry, OutcomeStatus, SchemaOp,
};
pub use storage::{FieldGroupStore, StorageConfig, StorageEngine};
