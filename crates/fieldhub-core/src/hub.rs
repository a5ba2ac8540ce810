//! FieldHub service object wiring storage, catalog, rules and migrations.

use crate::catalog::{FieldTypeRegistry, SchemaCatalog};
use crate::error::Error;
use crate::location::{LocationRuleEngine, RuleStore};
use crate::migration::{
    ManifestDirectory, MigrationError, MigrationLedger, MigrationRunner, MigrationSource,
};
use crate::storage::{FieldGroupStore, StorageConfig, StorageEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Configuration for a [`FieldHub`].
#[derive(Debug, Clone, Default)]
pub struct FieldHubConfig {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Directory of JSON migration manifests.
    pub migrations_dir: Option<PathBuf>,
}

impl FieldHubConfig {
    /// Create a configuration storing data under `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageConfig::new(path),
            migrations_dir: None,
        }
    }

    /// Create a temporary configuration for testing.
    pub fn temporary() -> Self {
        Self {
            storage: StorageConfig::temporary(),
            migrations_dir: None,
        }
    }

    /// Replace the storage configuration.
    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Set the manifest directory.
    pub fn with_migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = Some(dir.into());
        self
    }

    /// Set the page cache capacity.
    pub fn with_cache_capacity(mut self, bytes: u64) -> Self {
        self.storage = self.storage.with_cache_capacity(bytes);
        self
    }

    /// Set the flush interval. None flushes on every write.
    pub fn with_flush_every_ms(mut self, ms: Option<u64>) -> Self {
        self.storage = self.storage.with_flush_every_ms(ms);
        self
    }
}

/// Handle to one FieldHub installation.
///
/// Built once at startup and passed to every collaborator; cloning is cheap
/// and shares the same database.
#[derive(Clone)]
pub struct FieldHub {
    config: FieldHubConfig,
    engine: Arc<StorageEngine>,
    types: Arc<FieldTypeRegistry>,
    store: FieldGroupStore,
    rules: RuleStore,
}

impl FieldHub {
    /// Open an installation with the built-in field types.
    pub fn open(config: FieldHubConfig) -> Result<Self, Error> {
        Self::open_with_types(config, Arc::new(FieldTypeRegistry::new()))
    }

    /// Open an installation with a caller-supplied type registry.
    pub fn open_with_types(
        config: FieldHubConfig,
        types: Arc<FieldTypeRegistry>,
    ) -> Result<Self, Error> {
        let engine = Arc::new(StorageEngine::open(config.storage.clone())?);
        let store = FieldGroupStore::open(engine.clone(), types.clone())?;
        let rules = RuleStore::open(&engine)?;

        info!(
            path = %config.storage.path.display(),
            recovered = engine.was_recovered(),
            "opened fieldhub"
        );

        Ok(Self {
            config,
            engine,
            types,
            store,
            rules,
        })
    }

    /// Configuration the hub was opened with.
    pub fn config(&self) -> &FieldHubConfig {
        &self.config
    }

    /// The storage engine.
    pub fn engine(&self) -> &Arc<StorageEngine> {
        &self.engine
    }

    /// The field type registry.
    pub fn types(&self) -> &Arc<FieldTypeRegistry> {
        &self.types
    }

    /// The field group store.
    pub fn store(&self) -> &FieldGroupStore {
        &self.store
    }

    /// Read-only schema catalog.
    pub fn catalog(&self) -> SchemaCatalog {
        SchemaCatalog::new(self.store.clone())
    }

    /// Location rule engine.
    pub fn locations(&self) -> LocationRuleEngine {
        LocationRuleEngine::new(self.rules.clone(), self.store.clone())
    }

    /// Migration runner over `source`.
    pub fn migrator(
        &self,
        source: impl MigrationSource + 'static,
    ) -> Result<MigrationRunner, MigrationError> {
        let ledger = MigrationLedger::open(self.engine.clone())?;
        Ok(MigrationRunner::new(self.store.clone(), ledger, source))
    }

    /// Migration runner over the configured manifest directory.
    pub fn manifest_migrator(&self) -> Result<MigrationRunner, MigrationError> {
        let dir = self.config.migrations_dir.clone().ok_or_else(|| {
            MigrationError::InvalidMigration("no migrations directory configured".to_string())
        })?;
        self.migrator(ManifestDirectory::new(dir))
    }

    /// Drop a group together with its location rules.
    pub fn drop_group(&self, name: &str) -> Result<(), Error> {
        self.store.drop_group(name)?;
        self.rules.delete_rules(name)?;
        Ok(())
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.engine.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldType;
    use crate::location::{LocationContext, LocationRule, LocationType};
    use crate::migration::{FnMigration, MigrationSet};

    #[test]
    fn test_hub_wires_components() {
        let hub = FieldHub::open(FieldHubConfig::temporary()).unwrap();
        hub.store().create_group("products").unwrap();
        hub.store()
            .add_field("products", "price", FieldType::Number, 0)
            .unwrap();

        assert_eq!(hub.catalog().list_groups().unwrap(), vec!["products"]);

        let runner = hub.migrator(MigrationSet::new()).unwrap();
        assert!(runner.migrate().unwrap().outcomes.is_empty());
    }

    #[test]
    fn test_drop_group_removes_rules() {
        let hub = FieldHub::open(FieldHubConfig::temporary()).unwrap();
        hub.store().create_group("hero").unwrap();
        hub.locations()
            .save_rules("hero", &[vec![LocationRule::equals(LocationType::RecordType, "post")]])
            .unwrap();
        let context = LocationContext::new().with_record_type("post");
        assert!(hub.locations().matches("hero", &context));

        hub.drop_group("hero").unwrap();
        assert!(!hub.locations().matches("hero", &context));
        assert!(hub.locations().active_groups_for(&context).is_empty());
    }

    #[test]
    fn test_config_builder() {
        let config = FieldHubConfig::new("/var/lib/fieldhub")
            .with_migrations_dir("./migrations")
            .with_cache_capacity(64 * 1024 * 1024)
            .with_flush_every_ms(None);
        assert_eq!(config.storage.path, PathBuf::from("/var/lib/fieldhub"));
        assert_eq!(config.storage.cache_capacity, 64 * 1024 * 1024);
        assert_eq!(config.storage.flush_every_ms, None);
        assert_eq!(config.migrations_dir, Some(PathBuf::from("./migrations")));
    }

    #[test]
    fn test_manifest_migrator_requires_dir() {
        let hub = FieldHub::open(FieldHubConfig::temporary()).unwrap();
        assert!(matches!(
            hub.manifest_migrator(),
            Err(MigrationError::InvalidMigration(_))
        ));
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let config = FieldHubConfig::new(dir.path());
        {
            let hub = FieldHub::open(config.clone()).unwrap();
            hub.store().create_group("products").unwrap();
            hub.flush().unwrap();
        }
        let hub = FieldHub::open(config).unwrap();
        assert!(hub.store().group_exists("products").unwrap());
    }

    #[test]
    fn test_rolled_back_group_is_not_active() {
        let hub = FieldHub::open(FieldHubConfig::temporary()).unwrap();
        let runner = hub
            .migrator(MigrationSet::new().with(FnMigration::new(
                "001_hero",
                |store| Ok(store.create_group("hero")?),
                |store| Ok(store.drop_group("hero")?),
            )))
            .unwrap();
        runner.migrate().unwrap();

        hub.locations()
            .save_rules("hero", &[vec![LocationRule::equals(LocationType::RecordType, "post")]])
            .unwrap();
        let context = LocationContext::new().with_record_type("post");
        assert_eq!(hub.locations().active_groups_for(&context).len(), 1);

        let result = runner.rollback().unwrap();
        assert!(!result.has_errors());
        assert!(hub.catalog().list_groups().unwrap().is_empty());
        assert!(hub.locations().active_groups_for(&context).is_empty());
    }
}
