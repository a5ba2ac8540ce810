//! Migration-specific error types.

use std::path::PathBuf;
use thiserror::Error;

/// Migration-specific errors.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A migration unit is malformed or conflicts with another one.
    #[error("invalid migration: {0}")]
    InvalidMigration(String),

    /// A manifest file could not be parsed.
    #[error("invalid manifest {path}: {message}")]
    Manifest {
        /// Manifest file path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A code-defined migration step failed.
    #[error("migration step failed: {0}")]
    Step(String),

    /// Reading migration units failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] crate::error::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl MigrationError {
    /// Create a step failure from any message.
    pub fn step(message: impl Into<String>) -> Self {
        MigrationError::Step(message.into())
    }
}

impl From<sled::Error> for MigrationError {
    fn from(e: sled::Error) -> Self {
        MigrationError::Storage(crate::error::Error::Storage(e))
    }
}
