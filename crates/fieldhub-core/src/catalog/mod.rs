//! Schema catalog for FieldHub.
//!
//! Field types, field definitions, the type codec registry and the read-only
//! catalog view over the group store.

mod catalog;
mod field;
mod registry;
mod schema;
mod types;

pub use catalog::SchemaCatalog;
pub use field::{sort_definitions, FieldDefinition, FieldId};
pub use registry::{DecodeFn, EncodeFn, FieldTypeRegistry, FieldTypeSpec, StorageRepr};
pub use schema::SchemaSnapshot;
pub use types::FieldType;
