//! Core error types.

use thiserror::Error;

/// Result alias for storage, catalog and rule operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-correctable input problem.
    Validation,
    /// Caller and stored state disagree (exists / missing).
    Conflict,
    /// The backing store rejected or failed an operation.
    Storage,
}

/// Core errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// A group or field name is not storage-safe.
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// The group (or a table backing it) already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The group does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The field name is already defined in the group.
    #[error("duplicate field: {group}.{field}")]
    DuplicateField {
        /// Group name.
        group: String,
        /// Field name.
        field: String,
    },

    /// The field is not defined in the group.
    #[error("field not found: {group}.{field}")]
    FieldNotFound {
        /// Group name.
        group: String,
        /// Field name.
        field: String,
    },

    /// A value could not be encoded for its field type.
    #[error("invalid value for {field_type} field: {reason}")]
    InvalidValue {
        /// Field type tag.
        field_type: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// No codec is registered for the field type.
    #[error("unknown field type: {0}")]
    UnknownFieldType(String),

    /// A location rule is malformed.
    #[error("invalid location rule: {0}")]
    InvalidRule(String),
}

impl Error {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidName(_)
            | Error::DuplicateField { .. }
            | Error::InvalidValue { .. }
            | Error::UnknownFieldType(_)
            | Error::InvalidRule(_) => ErrorKind::Validation,
            Error::AlreadyExists(_) | Error::NotFound(_) | Error::FieldNotFound { .. } => {
                ErrorKind::Conflict
            }
            Error::Storage(_) | Error::Serialization(_) | Error::Deserialization(_) => {
                ErrorKind::Storage
            }
        }
    }
}
