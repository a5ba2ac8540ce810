//! Declarative schema operations and manifest-backed migrations.
//!
//! A manifest is a JSON document with an `up` and a `down` list of
//! operations:
//!
//! ```json
//! {
//!   "up": [
//!     { "op": "create_group", "group": "products" },
//!     { "op": "add_field", "group": "products", "field": "price", "type": "number" }
//!   ],
//!   "down": [
//!     { "op": "drop_group", "group": "products" }
//!   ]
//! }
//! ```

use super::error::MigrationError;
use super::unit::Migration;
use crate::catalog::FieldType;
use crate::storage::FieldGroupStore;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// A single schema operation against the group store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum SchemaOp {
    /// Create a field group.
    CreateGroup {
        /// Group name.
        group: String,
    },
    /// Drop a field group with all its fields and values.
    DropGroup {
        /// Group name.
        group: String,
    },
    /// Add a field to a group.
    AddField {
        /// Group name.
        group: String,
        /// Field name.
        field: String,
        /// Field type tag.
        #[serde(rename = "type")]
        field_type: FieldType,
        /// Display order.
        #[serde(default)]
        order: i64,
    },
    /// Remove a field and its values.
    RemoveField {
        /// Group name.
        group: String,
        /// Field name.
        field: String,
    },
    /// Rename a field, carrying its values.
    RenameField {
        /// Group name.
        group: String,
        /// Current name.
        from: String,
        /// New name.
        to: String,
    },
}

impl SchemaOp {
    /// Apply the operation.
    pub fn apply(&self, store: &FieldGroupStore) -> Result<(), MigrationError> {
        debug!(op = ?self, "apply schema op");
        match self {
            SchemaOp::CreateGroup { group } => store.create_group(group)?,
            SchemaOp::DropGroup { group } => store.drop_group(group)?,
            SchemaOp::AddField {
                group,
                field,
                field_type,
                order,
            } => {
                store.add_field(group, field, field_type.clone(), *order)?;
            }
            SchemaOp::RemoveField { group, field } => store.remove_field(group, field)?,
            SchemaOp::RenameField { group, from, to } => store.rename_field(group, from, to)?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    up: Vec<SchemaOp>,
    #[serde(default)]
    down: Vec<SchemaOp>,
}

/// A migration whose steps are lists of [`SchemaOp`].
///
/// Operations run in order and stop at the first failure. Operations that
/// already ran stay applied.
#[derive(Debug, Clone)]
pub struct ManifestMigration {
    id: String,
    manifest: Manifest,
    checksum: String,
}

impl ManifestMigration {
    /// Build a migration from operation lists.
    pub fn new(
        id: impl Into<String>,
        up: Vec<SchemaOp>,
        down: Vec<SchemaOp>,
    ) -> Result<Self, MigrationError> {
        let manifest = Manifest { up, down };
        let bytes = serde_json::to_vec(&manifest)
            .map_err(|e| MigrationError::Serialization(e.to_string()))?;
        Ok(Self {
            id: id.into(),
            checksum: blake3::hash(&bytes).to_hex().to_string(),
            manifest,
        })
    }

    /// Parse a manifest file body. The checksum covers the raw bytes.
    pub fn parse(id: impl Into<String>, path: &Path, bytes: &[u8]) -> Result<Self, MigrationError> {
        let manifest: Manifest =
            serde_json::from_slice(bytes).map_err(|e| MigrationError::Manifest {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(Self {
            id: id.into(),
            manifest,
            checksum: blake3::hash(bytes).to_hex().to_string(),
        })
    }

    /// Forward operations.
    pub fn up_ops(&self) -> &[SchemaOp] {
        &self.manifest.up
    }

    /// Reverse operations.
    pub fn down_ops(&self) -> &[SchemaOp] {
        &self.manifest.down
    }

    fn run(&self, ops: &[SchemaOp], store: &FieldGroupStore) -> Result<(), MigrationError> {
        for op in ops {
            op.apply(store)?;
        }
        Ok(())
    }
}

impl Migration for ManifestMigration {
    fn id(&self) -> &str {
        &self.id
    }

    fn up(&self, store: &FieldGroupStore) -> Result<(), MigrationError> {
        self.run(&self.manifest.up, store)
    }

    fn down(&self, store: &FieldGroupStore) -> Result<(), MigrationError> {
        self.run(&self.manifest.down, store)
    }

    fn checksum(&self) -> Option<String> {
        Some(self.checksum.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldTypeRegistry;
    use crate::error::Error;
    use crate::storage::{StorageConfig, StorageEngine};
    use std::sync::Arc;

    fn test_store() -> FieldGroupStore {
        let engine = Arc::new(StorageEngine::open(StorageConfig::temporary()).unwrap());
        FieldGroupStore::open(engine, Arc::new(FieldTypeRegistry::new())).unwrap()
    }

    const PRODUCTS: &str = r#"{
        "up": [
            { "op": "create_group", "group": "products" },
            { "op": "add_field", "group": "products", "field": "price", "type": "number" },
            { "op": "add_field", "group": "products", "field": "sku", "type": "text", "order": 1 }
        ],
        "down": [
            { "op": "drop_group", "group": "products" }
        ]
    }"#;

    #[test]
    fn test_parse_ops() {
        let migration =
            ManifestMigration::parse("001_products", Path::new("001.json"), PRODUCTS.as_bytes())
                .unwrap();
        assert_eq!(migration.up_ops().len(), 3);
        assert_eq!(
            migration.up_ops()[1],
            SchemaOp::AddField {
                group: "products".into(),
                field: "price".into(),
                field_type: FieldType::Number,
                order: 0,
            }
        );
        assert_eq!(migration.down_ops().len(), 1);
    }

    #[test]
    fn test_parse_rejects_unknown_op() {
        let err = ManifestMigration::parse(
            "001_bad",
            Path::new("001_bad.json"),
            br#"{ "up": [ { "op": "truncate", "group": "products" } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, MigrationError::Manifest { .. }));
    }

    #[test]
    fn test_checksum_tracks_content() {
        let a = ManifestMigration::parse("001", Path::new("a"), PRODUCTS.as_bytes()).unwrap();
        let b = ManifestMigration::parse("001", Path::new("b"), PRODUCTS.as_bytes()).unwrap();
        let c = ManifestMigration::parse("001", Path::new("c"), br#"{ "up": [] }"#).unwrap();
        assert_eq!(a.checksum(), b.checksum());
        assert_ne!(a.checksum(), c.checksum());
    }

    #[test]
    fn test_up_down() {
        let store = test_store();
        let migration =
            ManifestMigration::parse("001_products", Path::new("001.json"), PRODUCTS.as_bytes())
                .unwrap();

        migration.up(&store).unwrap();
        let names: Vec<_> = store
            .list_fields("products")
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["price", "sku"]);

        migration.down(&store).unwrap();
        assert!(!store.group_exists("products").unwrap());
    }

    #[test]
    fn test_op_failure_stops_run() {
        let store = test_store();
        let migration = ManifestMigration::new(
            "002_hero",
            vec![
                SchemaOp::CreateGroup { group: "hero".into() },
                SchemaOp::RenameField {
                    group: "hero".into(),
                    from: "title".into(),
                    to: "headline".into(),
                },
                SchemaOp::AddField {
                    group: "hero".into(),
                    field: "subtitle".into(),
                    field_type: FieldType::Text,
                    order: 0,
                },
            ],
            vec![SchemaOp::DropGroup { group: "hero".into() }],
        )
        .unwrap();

        let err = migration.up(&store).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::Storage(Error::FieldNotFound { .. })
        ));
        assert!(store.group_exists("hero").unwrap());
        assert!(store.field("hero", "subtitle").unwrap().is_none());
    }
}
