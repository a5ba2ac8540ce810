//! Physical storage of field groups.
//!
//! Every group owns two tables: a definition table (`field_name ->
//! FieldDefinition`) and a value table (`field_name 0x00 record_id ->
//! ValueRow`). A registry table maps group names to the sanitized slug the
//! table names are derived from.

use super::key::ValueKey;
use super::naming::{fields_table, slugify, validate_name, values_table};
use super::record::{GroupEntry, ValueRow};
use super::StorageEngine;
use crate::catalog::{sort_definitions, FieldDefinition, FieldId, FieldType, FieldTypeRegistry};
use crate::error::{Error, Result};
use serde_json::Value;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Batch, Transactional, Tree};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Table holding the group registry.
const REGISTRY_TABLE: &str = "fieldhub:groups";

/// Storage for field group definitions and values.
///
/// All operations persist immediately. There is no transaction spanning
/// several calls.
#[derive(Clone)]
pub struct FieldGroupStore {
    engine: Arc<StorageEngine>,
    registry: Tree,
    types: Arc<FieldTypeRegistry>,
}

/// The two tables of one group.
struct GroupTables {
    fields: Tree,
    values: Tree,
}

impl FieldGroupStore {
    /// Open the store on top of a storage engine.
    pub fn open(engine: Arc<StorageEngine>, types: Arc<FieldTypeRegistry>) -> Result<Self> {
        let registry = engine.open_table(REGISTRY_TABLE)?;
        Ok(Self {
            engine,
            registry,
            types,
        })
    }

    /// The field type registry used for typed values.
    pub fn types(&self) -> &FieldTypeRegistry {
        &self.types
    }

    // ========== Groups ==========

    /// Provision the definition and value tables of a new group.
    pub fn create_group(&self, name: &str) -> Result<()> {
        validate_name(name)?;

        if self.registry.contains_key(name)? {
            return Err(Error::AlreadyExists(name.to_string()));
        }

        let slug = slugify(name);
        for entry in self.entries()? {
            if entry.slug == slug {
                return Err(Error::AlreadyExists(format!(
                    "{name} (storage name {slug} is used by {})",
                    entry.name
                )));
            }
        }

        let fields = fields_table(&slug);
        let values = values_table(&slug);
        if self.engine.table_exists(&fields) || self.engine.table_exists(&values) {
            return Err(Error::AlreadyExists(format!("{name} (tables present)")));
        }

        let entry = GroupEntry::new(self.engine.generate_id()?, name, slug);
        self.engine.open_table(&fields)?;
        self.engine.open_table(&values)?;

        let inserted = self
            .registry
            .compare_and_swap(name, None as Option<&[u8]>, Some(entry.to_bytes()?))?;
        if inserted.is_err() {
            return Err(Error::AlreadyExists(name.to_string()));
        }

        info!(group = name, slug = %entry.slug, "created field group");
        Ok(())
    }

    /// Drop both tables of a group. All of its values are lost.
    pub fn drop_group(&self, name: &str) -> Result<()> {
        let entry = self.entry(name)?;

        self.engine.drop_table(&entry.fields_table())?;
        self.engine.drop_table(&entry.values_table())?;
        self.registry.remove(name)?;

        info!(group = name, "dropped field group");
        Ok(())
    }

    /// Check whether a group exists.
    pub fn group_exists(&self, name: &str) -> Result<bool> {
        Ok(self.registry.contains_key(name)?)
    }

    /// Names of all groups, sorted.
    pub fn group_names(&self) -> Result<Vec<String>> {
        Ok(self.entries()?.into_iter().map(|e| e.name).collect())
    }

    /// Registry entry of a group.
    pub fn group_entry(&self, name: &str) -> Result<Option<GroupEntry>> {
        match self.registry.get(name)? {
            Some(bytes) => Ok(Some(GroupEntry::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    // ========== Fields ==========

    /// Append a field definition.
    pub fn add_field(
        &self,
        group: &str,
        field_name: &str,
        field_type: FieldType,
        order: i64,
    ) -> Result<FieldId> {
        validate_name(field_name)?;
        if !self.types.contains(&field_type) {
            return Err(Error::UnknownFieldType(field_type.to_string()));
        }
        let tables = self.tables(group)?;

        let id = FieldId(self.engine.generate_id()?);
        let definition = FieldDefinition::new(id, field_name, field_type, order);
        let inserted = tables.fields.compare_and_swap(
            field_name,
            None as Option<&[u8]>,
            Some(definition.to_bytes()?),
        )?;
        if inserted.is_err() {
            return Err(Error::DuplicateField {
                group: group.to_string(),
                field: field_name.to_string(),
            });
        }

        debug!(group, field = field_name, field_type = %definition.field_type, order, "added field");
        Ok(id)
    }

    /// Delete a field definition and every value stored for it.
    pub fn remove_field(&self, group: &str, field_name: &str) -> Result<()> {
        let tables = self.tables(group)?;
        self.require_field(&tables, group, field_name)?;

        let value_keys: Vec<_> = tables
            .values
            .scan_prefix(ValueKey::field_prefix(field_name))
            .keys()
            .collect::<std::result::Result<_, _>>()?;

        let result: std::result::Result<(), TransactionError<Error>> = (&tables.fields, &tables.values)
            .transaction(|(fields_tx, values_tx)| {
                fields_tx.remove(field_name)?;
                for key in &value_keys {
                    values_tx.remove(key.clone())?;
                }
                Ok(())
            });
        unwrap_transaction(result)?;

        debug!(group, field = field_name, values = value_keys.len(), "removed field");
        Ok(())
    }

    /// Rename a field, re-keying its values. Id, type and order are kept.
    pub fn rename_field(&self, group: &str, old_name: &str, new_name: &str) -> Result<()> {
        validate_name(new_name)?;
        let tables = self.tables(group)?;
        let mut definition = self.require_field(&tables, group, old_name)?;

        if old_name == new_name {
            return Ok(());
        }
        if tables.fields.contains_key(new_name)? {
            return Err(Error::DuplicateField {
                group: group.to_string(),
                field: new_name.to_string(),
            });
        }

        definition.name = new_name.to_string();
        let definition_bytes = definition.to_bytes()?;

        let mut moved = Vec::new();
        for item in tables.values.scan_prefix(ValueKey::field_prefix(old_name)) {
            let (key, value) = item?;
            let decoded = ValueKey::decode(&key).ok_or_else(|| {
                Error::Deserialization(format!("malformed value key in group {group}"))
            })?;
            let new_key = ValueKey::new(new_name, decoded.record_id).encode();
            moved.push((key, new_key, value));
        }

        let result: std::result::Result<(), TransactionError<Error>> = (&tables.fields, &tables.values)
            .transaction(|(fields_tx, values_tx)| {
                if fields_tx.get(new_name)?.is_some() {
                    return Err(ConflictableTransactionError::Abort(Error::DuplicateField {
                        group: group.to_string(),
                        field: new_name.to_string(),
                    }));
                }
                fields_tx.remove(old_name)?;
                fields_tx.insert(new_name, definition_bytes.as_slice())?;
                for (old_key, new_key, value) in &moved {
                    values_tx.remove(old_key.clone())?;
                    values_tx.insert(new_key.as_slice(), value.clone())?;
                }
                Ok(())
            });
        unwrap_transaction(result)?;

        debug!(group, from = old_name, to = new_name, values = moved.len(), "renamed field");
        Ok(())
    }

    /// Look up one field definition.
    pub fn field(&self, group: &str, field_name: &str) -> Result<Option<FieldDefinition>> {
        let tables = self.tables(group)?;
        match tables.fields.get(field_name)? {
            Some(bytes) => Ok(Some(FieldDefinition::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Field definitions ordered by `order`, ties broken by name.
    pub fn list_fields(&self, group: &str) -> Result<Vec<FieldDefinition>> {
        let tables = self.tables(group)?;
        let mut fields = Vec::new();
        for item in tables.fields.iter() {
            let (_, bytes) = item?;
            fields.push(FieldDefinition::from_bytes(&bytes)?);
        }
        sort_definitions(&mut fields);
        Ok(fields)
    }

    // ========== Values ==========

    /// Read one value. Undefined fields read as `None`.
    pub fn get_value(&self, group: &str, record_id: u64, field_name: &str) -> Result<Option<String>> {
        let tables = self.tables(group)?;
        match tables.values.get(ValueKey::new(field_name, record_id).encode())? {
            Some(bytes) => Ok(Some(ValueRow::from_bytes(&bytes)?.data)),
            None => Ok(None),
        }
    }

    /// Insert or replace one value.
    pub fn set_value(
        &self,
        group: &str,
        record_id: u64,
        field_name: &str,
        value: impl Into<String>,
    ) -> Result<()> {
        let tables = self.tables(group)?;
        self.require_field(&tables, group, field_name)?;

        let row = ValueRow::new(value);
        tables
            .values
            .insert(ValueKey::new(field_name, record_id).encode(), row.to_bytes()?)?;

        debug!(group, record_id, field = field_name, "set value");
        Ok(())
    }

    /// Encode a value through the field's type codec and store it.
    pub fn set_typed_value(
        &self,
        group: &str,
        record_id: u64,
        field_name: &str,
        value: &Value,
    ) -> Result<()> {
        let tables = self.tables(group)?;
        let definition = self.require_field(&tables, group, field_name)?;
        let encoded = self.types.encode(&definition.field_type, value)?;

        tables.values.insert(
            ValueKey::new(field_name, record_id).encode(),
            ValueRow::new(encoded).to_bytes()?,
        )?;
        Ok(())
    }

    /// Read a value and decode it through the field's type codec.
    pub fn get_typed_value(
        &self,
        group: &str,
        record_id: u64,
        field_name: &str,
    ) -> Result<Option<Value>> {
        let tables = self.tables(group)?;
        let Some(definition) = Self::read_field(&tables, field_name)? else {
            return Ok(None);
        };
        match tables.values.get(ValueKey::new(field_name, record_id).encode())? {
            Some(bytes) => {
                let row = ValueRow::from_bytes(&bytes)?;
                Ok(Some(self.types.decode(&definition.field_type, &row.data)?))
            }
            None => Ok(None),
        }
    }

    /// Delete one value. Returns whether a row existed.
    pub fn delete_value(&self, group: &str, record_id: u64, field_name: &str) -> Result<bool> {
        let tables = self.tables(group)?;
        let removed = tables
            .values
            .remove(ValueKey::new(field_name, record_id).encode())?;
        Ok(removed.is_some())
    }

    /// All values of one record, keyed by field name.
    pub fn get_record(&self, group: &str, record_id: u64) -> Result<BTreeMap<String, String>> {
        let tables = self.tables(group)?;
        let mut record = BTreeMap::new();
        for name in tables.fields.iter().keys() {
            let name = key_to_string(&name?)?;
            if let Some(bytes) = tables.values.get(ValueKey::new(name.as_str(), record_id).encode())? {
                record.insert(name, ValueRow::from_bytes(&bytes)?.data);
            }
        }
        Ok(record)
    }

    /// Delete every value of one record. Returns the number of rows removed.
    pub fn delete_record(&self, group: &str, record_id: u64) -> Result<usize> {
        let tables = self.tables(group)?;
        let mut batch = Batch::default();
        let mut removed = 0;
        for name in tables.fields.iter().keys() {
            let key = ValueKey::new(key_to_string(&name?)?, record_id).encode();
            if tables.values.contains_key(&key)? {
                batch.remove(key);
                removed += 1;
            }
        }
        tables.values.apply_batch(batch)?;

        debug!(group, record_id, removed, "deleted record values");
        Ok(removed)
    }

    /// Number of stored values for one field.
    pub fn count_values(&self, group: &str, field_name: &str) -> Result<usize> {
        let tables = self.tables(group)?;
        Ok(tables
            .values
            .scan_prefix(ValueKey::field_prefix(field_name))
            .count())
    }

    // ========== Internals ==========

    fn entry(&self, name: &str) -> Result<GroupEntry> {
        self.group_entry(name)?
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    fn entries(&self) -> Result<Vec<GroupEntry>> {
        let mut entries = Vec::new();
        for item in self.registry.iter() {
            let (_, bytes) = item?;
            entries.push(GroupEntry::from_bytes(&bytes)?);
        }
        Ok(entries)
    }

    fn tables(&self, group: &str) -> Result<GroupTables> {
        let entry = self.entry(group)?;
        Ok(GroupTables {
            fields: self.engine.open_table(&entry.fields_table())?,
            values: self.engine.open_table(&entry.values_table())?,
        })
    }

    fn read_field(tables: &GroupTables, field_name: &str) -> Result<Option<FieldDefinition>> {
        match tables.fields.get(field_name)? {
            Some(bytes) => Ok(Some(FieldDefinition::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn require_field(
        &self,
        tables: &GroupTables,
        group: &str,
        field_name: &str,
    ) -> Result<FieldDefinition> {
        Self::read_field(tables, field_name)?.ok_or_else(|| Error::FieldNotFound {
            group: group.to_string(),
            field: field_name.to_string(),
        })
    }
}

fn key_to_string(key: &[u8]) -> Result<String> {
    String::from_utf8(key.to_vec()).map_err(|e| Error::Deserialization(e.to_string()))
}

fn unwrap_transaction(result: std::result::Result<(), TransactionError<Error>>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(TransactionError::Abort(e)) => Err(e),
        Err(TransactionError::Storage(e)) => Err(Error::Storage(e)),
    }
}
