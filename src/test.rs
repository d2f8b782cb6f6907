//! Helpers for tests: a throwaway keeper and seeded records.

use tempfile::TempDir;

use crate::keeper::Keeper;
use crate::types::StateInfoIndex;
use crate::{QueryConfig, RocksdbConfig};

/// A [`Keeper`] backed by a temporary directory that is removed on drop.
pub struct TestKeeper {
    keeper: Keeper,
    // Dropped after the keeper so RocksDB is closed before the directory goes away.
    tmpdir: TempDir,
}

impl TestKeeper {
    /// Opens an empty keeper with default settings.
    pub fn new() -> Self {
        Self::with_query_config(QueryConfig::default())
    }

    /// Opens an empty keeper with the given query settings.
    pub fn with_query_config(query_config: QueryConfig) -> Self {
        let tmpdir = tempfile::tempdir().expect("Failed to create temp dir");
        let keeper = Keeper::open(tmpdir.path(), &RocksdbConfig::default(), query_config)
            .expect("Failed to open keeper");
        Self { keeper, tmpdir }
    }

    /// Directory holding the database.
    pub fn path(&self) -> &std::path::Path {
        self.tmpdir.path()
    }

    /// Closes the keeper and hands back its directory, so it can be reopened.
    pub fn close(self) -> TempDir {
        drop(self.keeper);
        self.tmpdir
    }
}

impl Default for TestKeeper {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestKeeper {
    type Target = Keeper;

    fn deref(&self) -> &Self::Target {
        &self.keeper
    }
}

/// Stores `n` indexes with rollapp ids `"0"..n` and index equal to the position, returning them
/// in creation order.
pub fn create_n_latest_state_info_index(keeper: &Keeper, n: usize) -> Vec<StateInfoIndex> {
    let items: Vec<StateInfoIndex> = (0..n)
        .map(|i| StateInfoIndex {
            rollapp_id: i.to_string(),
            index: i as u64,
        })
        .collect();
    for item in &items {
        keeper
            .set_latest_state_info_index(item)
            .expect("Failed to store latest state info index");
    }
    items
}
