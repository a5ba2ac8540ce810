//! Storage engine implementation.

use super::StorageConfig;
use crate::error::Error;
use sled::{Db, Tree};
use tracing::debug;

/// The storage engine wrapping sled.
///
/// Each logical table is a sled tree. The engine only knows table names;
/// what a table holds is up to the caller.
pub struct StorageEngine {
    /// The underlying sled database.
    db: Db,
}

impl StorageEngine {
    /// Open or create a storage engine with the given configuration.
    pub fn open(config: StorageConfig) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        Ok(Self { db })
    }

    /// Wrap an already opened sled database.
    pub fn from_db(db: Db) -> Self {
        Self { db }
    }

    /// Check if the database was recovered from a previous crash.
    pub fn was_recovered(&self) -> bool {
        self.db.was_recovered()
    }

    /// Open a table, creating it if absent.
    pub fn open_table(&self, name: &str) -> Result<Tree, Error> {
        Ok(self.db.open_tree(name)?)
    }

    /// Drop a table and all of its rows.
    ///
    /// Returns `false` if the table did not exist.
    pub fn drop_table(&self, name: &str) -> Result<bool, Error> {
        let dropped = self.db.drop_tree(name)?;
        debug!(table = name, dropped, "drop table");
        Ok(dropped)
    }

    /// Check whether a table exists.
    pub fn table_exists(&self, name: &str) -> bool {
        self.db
            .tree_names()
            .iter()
            .any(|existing| existing.as_ref() == name.as_bytes())
    }

    /// Names of all tables, excluding sled's default tree.
    pub fn table_names(&self) -> Vec<String> {
        self.db
            .tree_names()
            .into_iter()
            .filter_map(|name| String::from_utf8(name.to_vec()).ok())
            .filter(|name| name != "__sled__default")
            .collect()
    }

    /// Generate a monotonically increasing id.
    ///
    /// Ids survive restarts; sled persists the counter.
    pub fn generate_id(&self) -> Result<u64, Error> {
        Ok(self.db.generate_id()?)
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }

    /// Get database size in bytes.
    pub fn size_on_disk(&self) -> Result<u64, Error> {
        Ok(self.db.size_on_disk()?)
    }

    /// Get the underlying sled database.
    pub fn db(&self) -> &Db {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_engine() -> StorageEngine {
        StorageEngine::open(StorageConfig::temporary()).unwrap()
    }

    #[test]
    fn test_open_and_drop_table() {
        let engine = test_engine();
        assert!(!engine.table_exists("t1"));

        let tree = engine.open_table("t1").unwrap();
        tree.insert(b"k", b"v").unwrap();
        assert!(engine.table_exists("t1"));
        assert!(engine.table_names().contains(&"t1".to_string()));

        assert!(engine.drop_table("t1").unwrap());
        assert!(!engine.table_exists("t1"));
        assert!(!engine.drop_table("t1").unwrap());
    }

    #[test]
    fn test_dropped_table_reopens_empty() {
        let engine = test_engine();
        let tree = engine.open_table("t1").unwrap();
        tree.insert(b"k", b"v").unwrap();
        engine.drop_table("t1").unwrap();

        let tree = engine.open_table("t1").unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_generate_id_increases() {
        let engine = test_engine();
        let a = engine.generate_id().unwrap();
        let b = engine.generate_id().unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::new(dir.path());

        {
            let engine = StorageEngine::open(config.clone()).unwrap();
            engine.open_table("t1").unwrap().insert(b"k", b"v").unwrap();
            engine.flush().unwrap();
        }

        {
            let engine = StorageEngine::open(config).unwrap();
            assert!(engine.table_exists("t1"));
            let value = engine.open_table("t1").unwrap().get(b"k").unwrap();
            assert_eq!(value.as_deref(), Some(&b"v"[..]));
        }
    }
}
