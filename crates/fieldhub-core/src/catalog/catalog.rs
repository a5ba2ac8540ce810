//! Read-only schema catalog.

use super::{FieldDefinition, SchemaSnapshot};
use crate::error::Error;
use crate::storage::FieldGroupStore;

/// Read view over the groups and fields held by a [`FieldGroupStore`].
///
/// Holds no state of its own; every call reads through to the store.
#[derive(Clone)]
pub struct SchemaCatalog {
    store: FieldGroupStore,
}

impl SchemaCatalog {
    /// Create a catalog over a store.
    pub fn new(store: FieldGroupStore) -> Self {
        Self { store }
    }

    /// List all group names, sorted.
    pub fn list_groups(&self) -> Result<Vec<String>, Error> {
        self.store.group_names()
    }

    /// Field definitions of a group in display order, or `None` if absent.
    pub fn describe_group(&self, name: &str) -> Result<Option<Vec<FieldDefinition>>, Error> {
        if !self.store.group_exists(name)? {
            return Ok(None);
        }
        match self.store.list_fields(name) {
            Ok(fields) => Ok(Some(fields)),
            // Dropped between the two reads
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Number of fields in a group, or `None` if absent.
    pub fn field_count(&self, name: &str) -> Result<Option<usize>, Error> {
        Ok(self.describe_group(name)?.map(|fields| fields.len()))
    }

    /// Snapshot of every group.
    pub fn snapshot(&self) -> Result<SchemaSnapshot, Error> {
        let mut snapshot = SchemaSnapshot::new();
        for name in self.list_groups()? {
            if let Some(fields) = self.describe_group(&name)? {
                snapshot.groups.insert(name, fields);
            }
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldType, FieldTypeRegistry};
    use crate::storage::{StorageConfig, StorageEngine};
    use std::sync::Arc;

    fn test_catalog() -> (FieldGroupStore, SchemaCatalog) {
        let engine = Arc::new(StorageEngine::open(StorageConfig::temporary()).unwrap());
        let store = FieldGroupStore::open(engine, Arc::new(FieldTypeRegistry::new())).unwrap();
        let catalog = SchemaCatalog::new(store.clone());
        (store, catalog)
    }

    #[test]
    fn test_catalog_empty() {
        let (_, catalog) = test_catalog();
        assert!(catalog.list_groups().unwrap().is_empty());
        assert!(catalog.describe_group("products").unwrap().is_none());
        assert!(catalog.snapshot().unwrap().groups.is_empty());
    }

    #[test]
    fn test_catalog_reflects_store() {
        let (store, catalog) = test_catalog();
        store.create_group("products").unwrap();
        store.create_group("hero").unwrap();
        store.add_field("products", "sku", FieldType::Text, 1).unwrap();
        store.add_field("products", "price", FieldType::Number, 0).unwrap();

        assert_eq!(catalog.list_groups().unwrap(), vec!["hero", "products"]);

        let fields = catalog.describe_group("products").unwrap().unwrap();
        let summary: Vec<_> = fields
            .iter()
            .map(|f| (f.name.as_str(), f.field_type.tag(), f.order))
            .collect();
        assert_eq!(summary, vec![("price", "number", 0), ("sku", "text", 1)]);
        assert_eq!(catalog.field_count("hero").unwrap(), Some(0));

        store.drop_group("products").unwrap();
        assert!(catalog.describe_group("products").unwrap().is_none());
    }

    #[test]
    fn test_snapshot() {
        let (store, catalog) = test_catalog();
        store.create_group("products").unwrap();
        store.add_field("products", "price", FieldType::Number, 0).unwrap();

        let snapshot = catalog.snapshot().unwrap();
        assert_eq!(snapshot.group_names(), vec!["products"]);
        assert_eq!(snapshot.group("products").unwrap()[0].name, "price");
    }
}
