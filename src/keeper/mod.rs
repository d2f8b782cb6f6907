//! The rollapp keeper: typed access to the latest state info index of every rollapp.

mod grpc_query;

use std::path::Path;

use anyhow::Context;
use prost::Message;
use tracing::debug;

use crate::schema::{KeyDecoder, KeyEncoder, ValueCodec};
use crate::types::StateInfoIndex;
use crate::{
    define_schema, gen_rocksdb_options, CodecError, QueryConfig, RocksdbConfig, Schema,
    SchemaBatch, SeekKeyEncoder, DB, DEFAULT_COLUMN_FAMILY_NAME,
};

/// Separator appended to every rollapp id in store keys.
pub const KEY_SEPARATOR: u8 = b'/';

const DB_NAME: &str = "rollapp-keeper";

define_schema!(
    /// Latest [`StateInfoIndex`] of each rollapp, keyed by rollapp id.
    LatestStateInfoIndexSchema,
    String,
    StateInfoIndex,
    "latest_state_info_index"
);

fn encode_rollapp_key(rollapp_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(rollapp_id.len() + 1);
    key.extend_from_slice(rollapp_id.as_bytes());
    key.push(KEY_SEPARATOR);
    key
}

impl KeyEncoder<LatestStateInfoIndexSchema> for String {
    fn encode_key(&self) -> crate::schema::Result<Vec<u8>> {
        Ok(encode_rollapp_key(self))
    }
}

impl KeyDecoder<LatestStateInfoIndexSchema> for String {
    fn decode_key(data: &[u8]) -> crate::schema::Result<Self> {
        let rollapp_id = data
            .strip_suffix(&[KEY_SEPARATOR])
            .ok_or_else(|| anyhow::anyhow!("Missing key separator in {data:?}"))?;
        Ok(String::from_utf8(rollapp_id.to_vec()).context("Rollapp id is not utf-8")?)
    }
}

impl SeekKeyEncoder<LatestStateInfoIndexSchema> for String {
    fn encode_seek_key(&self) -> crate::schema::Result<Vec<u8>> {
        Ok(encode_rollapp_key(self))
    }
}

impl ValueCodec<LatestStateInfoIndexSchema> for StateInfoIndex {
    fn encode_value(&self) -> crate::schema::Result<Vec<u8>> {
        Ok(self.encode_to_vec())
    }

    fn decode_value(data: &[u8]) -> crate::schema::Result<Self> {
        StateInfoIndex::decode(data).map_err(CodecError::from)
    }
}

/// Handle to the rollapp module's persistent state.
#[derive(Debug)]
pub struct Keeper {
    db: DB,
    query_config: QueryConfig,
}

impl Keeper {
    /// Column families the keeper opens.
    pub const COLUMN_FAMILIES: [&'static str; 2] = [
        DEFAULT_COLUMN_FAMILY_NAME,
        LatestStateInfoIndexSchema::COLUMN_FAMILY_NAME,
    ];

    /// Opens (creating if needed) the keeper's database at `path`.
    pub fn open(
        path: impl AsRef<Path>,
        rocksdb_config: &RocksdbConfig,
        query_config: QueryConfig,
    ) -> anyhow::Result<Self> {
        let db_opts = gen_rocksdb_options(rocksdb_config, false);
        let db = DB::open(path, DB_NAME, Self::COLUMN_FAMILIES, &db_opts)?;
        Ok(Self::new(db, query_config))
    }

    /// Opens an existing keeper database for queries only.
    pub fn open_read_only(
        path: impl AsRef<Path>,
        rocksdb_config: &RocksdbConfig,
        query_config: QueryConfig,
    ) -> anyhow::Result<Self> {
        let db_opts = gen_rocksdb_options(rocksdb_config, true);
        let db = DB::open_read_only(path, DB_NAME, Self::COLUMN_FAMILIES, &db_opts)?;
        Ok(Self::new(db, query_config))
    }

    /// Wraps an already opened [`DB`]. It must contain [`Keeper::COLUMN_FAMILIES`].
    pub fn new(db: DB, query_config: QueryConfig) -> Self {
        Self { db, query_config }
    }

    /// The underlying database.
    pub fn db(&self) -> &DB {
        &self.db
    }

    /// Settings used by the query handlers.
    pub fn query_config(&self) -> &QueryConfig {
        &self.query_config
    }

    /// Stores `index` as the latest state info index of its rollapp, replacing any previous one.
    pub fn set_latest_state_info_index(&self, index: &StateInfoIndex) -> anyhow::Result<()> {
        debug!(rollapp_id = %index.rollapp_id, index = index.index, "Set latest state info index");
        self.db.put::<LatestStateInfoIndexSchema>(&index.rollapp_id, index)
    }

    /// Stores all `indexes` in one atomic write.
    pub fn set_latest_state_info_indexes<'a>(
        &self,
        indexes: impl IntoIterator<Item = &'a StateInfoIndex>,
    ) -> anyhow::Result<()> {
        let mut batch = SchemaBatch::new();
        for index in indexes {
            batch.put::<LatestStateInfoIndexSchema>(&index.rollapp_id, index)?;
        }
        debug!(count = batch.len(), "Set latest state info indexes");
        self.db.write_schemas(&batch)
    }

    /// Returns the latest state info index of `rollapp_id`, if any.
    pub fn get_latest_state_info_index(
        &self,
        rollapp_id: &str,
    ) -> anyhow::Result<Option<StateInfoIndex>> {
        self.db.get::<LatestStateInfoIndexSchema>(&rollapp_id.to_string())
    }

    /// Removes the latest state info index of `rollapp_id`. Removing a missing entry is a no-op.
    pub fn remove_latest_state_info_index(&self, rollapp_id: &str) -> anyhow::Result<()> {
        debug!(rollapp_id, "Remove latest state info index");
        self.db.delete::<LatestStateInfoIndexSchema>(&rollapp_id.to_string())
    }

    /// Returns every stored latest state info index in store order, i.e. ordered by the rollapp
    /// id followed by [`KEY_SEPARATOR`].
    pub fn get_all_latest_state_info_index(&self) -> anyhow::Result<Vec<StateInfoIndex>> {
        self.db
            .iter::<LatestStateInfoIndexSchema>()?
            .map(|item| item.map(|output| output.value))
            .collect()
    }
}
