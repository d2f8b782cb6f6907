use std::num::NonZeroU64;

/// Selected RocksDB options for the keeper's state db.
/// See <https://github.com/facebook/rocksdb/blob/master/include/rocksdb/options.h>
/// for detailed explanations.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RocksdbConfig {
    /// The maximum number of files that can be open concurrently. Defaults to 5000
    pub max_open_files: i32,
    /// Once write-ahead logs exceed this size, RocksDB will start forcing the flush of column
    /// families whose memtables are backed by the oldest live WAL file. Defaults to 1GB
    pub max_total_wal_size: u64,
    /// The maximum number of background threads, including threads for flushing and compaction.
    /// Defaults to 16.
    pub max_background_jobs: i32,
}

impl Default for RocksdbConfig {
    fn default() -> Self {
        Self {
            max_open_files: 5000,
            max_total_wal_size: 1u64 << 30,
            max_background_jobs: 16,
        }
    }
}

/// Generate [`rocksdb::Options`] corresponding to the given [`RocksdbConfig`].
///
/// A writable db creates itself and its column families on first open. A read-only db expects
/// both to exist already.
pub fn gen_rocksdb_options(config: &RocksdbConfig, readonly: bool) -> rocksdb::Options {
    let mut db_opts = rocksdb::Options::default();
    db_opts.set_max_open_files(config.max_open_files);
    db_opts.set_max_total_wal_size(config.max_total_wal_size);
    db_opts.set_max_background_jobs(config.max_background_jobs);
    if !readonly {
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
    }

    db_opts
}

/// Limit applied to paginated queries that do not set one.
pub const DEFAULT_LIMIT: NonZeroU64 = match NonZeroU64::new(100) {
    Some(limit) => limit,
    None => unreachable!(),
};

/// Settings for the query handlers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QueryConfig {
    /// Page size used when a request leaves `limit` at zero. Such requests also get a total
    /// count. Defaults to [`DEFAULT_LIMIT`]. Non-zero, so a cursor always advances.
    pub default_limit: NonZeroU64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
        }
    }
}
