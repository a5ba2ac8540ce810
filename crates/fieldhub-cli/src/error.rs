//! CLI error types.

use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Storage, catalog or rule error.
    #[error("{0}")]
    Core(#[from] fieldhub_core::Error),

    /// Migration error.
    #[error("{0}")]
    Migration(#[from] fieldhub_core::MigrationError),

    /// Malformed JSON argument.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
