// SPDX-License-Identifier: Apache-2.0
// Storage layer adapted from rockbound (itself adapted from aptos-core/schemadb)

//! A keeper for the rollapp module's latest state info indexes, stored in
//! [RocksDB](https://rocksdb.org/) and served through gRPC-style query handlers.
//!
//! The crate has two layers:
//!
//! - A schematized DB ([`DB`]) where each kind of key-value pair lives in its own column family
//!   and all data passed in and out is typed according to a [`Schema`]. Use the
//!   [`define_schema!`] macro to declare the schema name, key and value types and column family.
//! - The [`keeper::Keeper`], which owns the latest-state-info-index schema and answers the
//!   point lookup and paginated listing queries, returning [`tonic::Status`] errors. Listing goes
//!   through the generic [`pagination::paginate`], which works for any schema.
#![deny(missing_docs)]
#![forbid(unsafe_code)]

mod iterator;
pub mod keeper;
mod metrics;
pub mod pagination;
pub mod schema;
mod schema_batch;
pub mod types;

mod config;
#[cfg(feature = "test-utils")]
pub mod test;

pub use config::{gen_rocksdb_options, QueryConfig, RocksdbConfig, DEFAULT_LIMIT};

use std::{path::Path, sync::Arc};

use anyhow::format_err;
use iterator::ScanDirection;
pub use iterator::{IteratorOutput, SchemaIterator, SeekKeyEncoder};
use metrics::{
    SCHEMADB_BATCH_COMMIT_BYTES, SCHEMADB_BATCH_COMMIT_LATENCY_SECONDS, SCHEMADB_DELETES,
    SCHEMADB_GET_BYTES, SCHEMADB_GET_LATENCY_SECONDS, SCHEMADB_PUT_BYTES,
};
pub use rocksdb;
pub use rocksdb::DEFAULT_COLUMN_FAMILY_NAME;
use thiserror::Error;
use tracing::info;

pub use crate::schema::Schema;
pub use crate::schema_batch::SchemaBatch;
use crate::schema::{KeyEncoder, ValueCodec};

/// This DB is a schematized RocksDB wrapper where all data passed in and out are typed according to
/// [`Schema`]s.
#[derive(Debug)]
pub struct DB {
    name: &'static str, // for logging
    db: Arc<rocksdb::DB>,
}

/// Returns the default column family descriptor. Includes LZ4 compression.
pub fn default_cf_descriptor(cf_name: impl Into<String>) -> rocksdb::ColumnFamilyDescriptor {
    let mut cf_opts = rocksdb::Options::default();
    cf_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
    rocksdb::ColumnFamilyDescriptor::new(cf_name, cf_opts)
}

impl DB {
    /// Opens a database backed by RocksDB, using the provided column family names and default
    /// column family options.
    #[tracing::instrument(skip_all, level = "error")]
    pub fn open(
        path: impl AsRef<Path>,
        name: &'static str,
        column_families: impl IntoIterator<Item = impl Into<String>>,
        db_opts: &rocksdb::Options,
    ) -> anyhow::Result<Self> {
        let descriptors = column_families
            .into_iter()
            .map(|cf| default_cf_descriptor(cf.into()));
        DB::open_with_cfds(db_opts, path, name, descriptors)
    }

    /// Open RocksDB with the provided column family descriptors.
    /// This allows the caller to configure options for each column family.
    #[tracing::instrument(skip_all, level = "error")]
    pub fn open_with_cfds(
        db_opts: &rocksdb::Options,
        path: impl AsRef<Path>,
        name: &'static str,
        cfds: impl IntoIterator<Item = rocksdb::ColumnFamilyDescriptor>,
    ) -> anyhow::Result<DB> {
        let inner = with_error_logging(
            || rocksdb::DB::open_cf_descriptors(db_opts, path, cfds),
            "open_with_cfds",
        )?;
        Ok(Self::log_construct(name, inner, false))
    }

    /// Opens an existing database in read-only mode. Writes through the returned handle fail.
    #[tracing::instrument(skip_all, level = "error")]
    pub fn open_read_only(
        path: impl AsRef<Path>,
        name: &'static str,
        column_families: impl IntoIterator<Item = impl Into<String>>,
        db_opts: &rocksdb::Options,
    ) -> anyhow::Result<Self> {
        let column_families: Vec<String> = column_families.into_iter().map(Into::into).collect();
        let inner = with_error_logging(
            || rocksdb::DB::open_cf_for_read_only(db_opts, path, column_families, false),
            "open_read_only",
        )?;
        Ok(Self::log_construct(name, inner, true))
    }

    fn log_construct(name: &'static str, inner: rocksdb::DB, readonly: bool) -> DB {
        info!(rocksdb_name = name, path = %inner.path().display(), readonly, "Opened RocksDB");
        DB {
            name,
            db: Arc::new(inner),
        }
    }

    /// Reads single record by key.
    #[tracing::instrument(skip_all, level = "error")]
    pub fn get<S: Schema>(
        &self,
        schema_key: &impl KeyEncoder<S>,
    ) -> anyhow::Result<Option<S::Value>> {
        let encoded_key = schema_key.encode_key()?;
        with_error_logging::<_, _, anyhow::Error>(
            || {
                let _timer = SCHEMADB_GET_LATENCY_SECONDS
                    .with_label_values(&[S::COLUMN_FAMILY_NAME])
                    .start_timer();

                let cf_handle = self.get_cf_handle(S::COLUMN_FAMILY_NAME)?;
                let result = self.db.get_pinned_cf(cf_handle, &encoded_key)?;
                SCHEMADB_GET_BYTES
                    .with_label_values(&[S::COLUMN_FAMILY_NAME])
                    .observe(result.as_ref().map_or(0.0, |v| v.len() as f64));
                result
                    .map(|raw_value| <S::Value as ValueCodec<S>>::decode_value(&raw_value))
                    .transpose()
                    .map_err(|err| err.into())
            },
            "get",
        )
    }

    /// Writes single record.
    #[tracing::instrument(skip_all, level = "error")]
    pub fn put<S: Schema>(
        &self,
        key: &impl schema::KeyCodec<S>,
        value: &impl ValueCodec<S>,
    ) -> anyhow::Result<()> {
        // A single-entry batch keeps the write counters in one place.
        with_error_logging(
            || {
                let mut batch = SchemaBatch::new();
                batch.put::<S>(key, value)?;
                self.write_schemas_inner(&batch)
            },
            "put",
        )
    }

    /// Delete a single key from the database.
    #[tracing::instrument(skip_all, level = "error")]
    pub fn delete<S: Schema>(&self, key: &impl schema::KeyCodec<S>) -> anyhow::Result<()> {
        with_error_logging(
            || {
                let mut batch = SchemaBatch::new();
                batch.delete::<S>(key)?;
                self.write_schemas_inner(&batch)
            },
            "delete",
        )
    }

    fn iter_with_direction<S: Schema>(
        &self,
        direction: ScanDirection,
    ) -> anyhow::Result<SchemaIterator<'_, S>> {
        let cf_handle = self.get_cf_handle(S::COLUMN_FAMILY_NAME)?;
        Ok(SchemaIterator::new(
            self.db.raw_iterator_cf(cf_handle),
            direction,
        ))
    }

    /// Returns a forward [`SchemaIterator`] on a certain schema, positioned at the first key.
    #[tracing::instrument(skip_all, level = "error")]
    pub fn iter<S: Schema>(&self) -> anyhow::Result<SchemaIterator<'_, S>> {
        self.iter_with_direction::<S>(ScanDirection::Forward)
    }

    /// Returns a backward [`SchemaIterator`] on a certain schema, positioned at the last key.
    #[tracing::instrument(skip_all, level = "error")]
    pub fn rev_iter<S: Schema>(&self) -> anyhow::Result<SchemaIterator<'_, S>> {
        self.iter_with_direction::<S>(ScanDirection::Backward)
    }

    fn write_schemas_inner(&self, batch: &SchemaBatch) -> anyhow::Result<()> {
        let _timer = SCHEMADB_BATCH_COMMIT_LATENCY_SECONDS
            .with_label_values(&[self.name])
            .start_timer();

        let mut db_batch = rocksdb::WriteBatch::default();
        let mut columns_written = Vec::with_capacity(batch.last_writes.len());
        for (cf_name, rows) in batch.last_writes.iter() {
            let cf_handle = self.get_cf_handle(cf_name)?;
            let mut write_sizes = Vec::with_capacity(rows.len());
            let mut deletes_for_cf = 0;
            for (key, operation) in rows {
                match operation {
                    Operation::Put { value } => {
                        write_sizes.push(key.len() + value.len());
                        db_batch.put_cf(cf_handle, key, value);
                    }
                    Operation::Delete => {
                        db_batch.delete_cf(cf_handle, key);
                        deletes_for_cf += 1;
                    }
                }
            }
            columns_written.push((*cf_name, write_sizes, deletes_for_cf));
        }

        let serialized_size = db_batch.size_in_bytes();
        self.db.write_opt(db_batch, &default_write_options())?;

        // Bump counters only after DB write succeeds.
        for (cf_name, bytes, deletes) in columns_written {
            for write_size in bytes {
                SCHEMADB_PUT_BYTES
                    .with_label_values(&[cf_name])
                    .observe(write_size as f64);
            }
            SCHEMADB_DELETES
                .with_label_values(&[cf_name])
                .inc_by(deletes);
        }
        SCHEMADB_BATCH_COMMIT_BYTES
            .with_label_values(&[self.name])
            .observe(serialized_size as f64);

        Ok(())
    }

    /// Writes a group of records wrapped in a [`SchemaBatch`] atomically.
    #[tracing::instrument(skip_all, level = "error")]
    pub fn write_schemas(&self, batch: &SchemaBatch) -> anyhow::Result<()> {
        with_error_logging(|| self.write_schemas_inner(batch), "write_schemas")
    }

    fn get_cf_handle(&self, cf_name: &str) -> anyhow::Result<&rocksdb::ColumnFamily> {
        with_error_logging(
            || {
                self.db.cf_handle(cf_name).ok_or_else(|| {
                    format_err!("DB::cf_handle not found for column family name: {cf_name}",)
                })
            },
            "get_cf_handle",
        )
    }
}

fn with_error_logging<F, T, E: Into<anyhow::Error>>(f: F, name: &str) -> anyhow::Result<T>
where
    F: FnOnce() -> Result<T, E>,
{
    let result = f().map_err(|e| e.into());
    if let Err(e) = &result {
        tracing::error!("[RollappKeeper] error during {}: {}", name, e);
    }
    result
}

/// Readability alias for a key in the DB.
pub type SchemaKey = Vec<u8>;
/// Readability alias for a value in the DB.
pub type SchemaValue = Vec<u8>;

/// Represents operation written to the database.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Operation<V = SchemaValue> {
    /// Writing a value to the DB.
    Put {
        /// Value to write
        value: V,
    },
    /// Deleting a value
    Delete,
}

/// An error that occurred during (de)serialization of a [`Schema`]'s keys or
/// values.
#[derive(Error, Debug)]
pub enum CodecError {
    /// A stored protobuf message could not be decoded.
    #[error("Invalid protobuf value: {0}")]
    Protobuf(#[from] prost::DecodeError),
    /// Some other error occurred when (de)serializing a key or value. Inspect
    /// the inner [`anyhow::Error`] for more details.
    #[error(transparent)]
    Wrapped(#[from] anyhow::Error),
}

/// All writes are synchronous: once the operation returns `Ok(())` the data is persisted even if
/// the machine crashes.
fn default_write_options() -> rocksdb::WriteOptions {
    let mut opts = rocksdb::WriteOptions::default();
    opts.set_sync(true);
    opts
}
