//! Migration discovery.

use super::error::MigrationError;
use super::ops::ManifestMigration;
use super::unit::Migration;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Supplies the set of known migration units.
pub trait MigrationSource: Send + Sync {
    /// Load every unit. Order does not matter; the runner sorts by id.
    fn load(&self) -> Result<Vec<Arc<dyn Migration>>, MigrationError>;
}

/// An in-memory set of migration units.
#[derive(Clone, Default)]
pub struct MigrationSet {
    units: Vec<Arc<dyn Migration>>,
}

impl MigrationSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit.
    pub fn with(mut self, unit: impl Migration + 'static) -> Self {
        self.add(unit);
        self
    }

    /// Add a unit.
    pub fn add(&mut self, unit: impl Migration + 'static) {
        self.units.push(Arc::new(unit));
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl MigrationSource for MigrationSet {
    fn load(&self) -> Result<Vec<Arc<dyn Migration>>, MigrationError> {
        Ok(self.units.clone())
    }
}

/// A directory of `*.json` manifests. The file stem is the migration id.
#[derive(Debug, Clone)]
pub struct ManifestDirectory {
    path: PathBuf,
}

impl ManifestDirectory {
    /// Create a source reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MigrationSource for ManifestDirectory {
    fn load(&self) -> Result<Vec<Arc<dyn Migration>>, MigrationError> {
        let mut units: Vec<Arc<dyn Migration>> = Vec::new();
        for entry in std::fs::read_dir(&self.path)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let id = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .ok_or_else(|| {
                    MigrationError::InvalidMigration(format!(
                        "manifest file name is not valid UTF-8: {}",
                        path.display()
                    ))
                })?
                .to_string();
            let bytes = std::fs::read(&path)?;
            debug!(id = %id, path = %path.display(), "loaded manifest");
            units.push(Arc::new(ManifestMigration::parse(id, &path, &bytes)?));
        }
        Ok(units)
    }
}
