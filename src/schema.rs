// SPDX-License-Identifier: Apache-2.0

//! A type-safe interface over [`DB`](crate::DB) column families.

use std::fmt::Debug;

use crate::CodecError;

/// Column family names are known at compile time, so they can have `static` lifetimes.
pub type ColumnFamilyName = &'static str;

/// A [`Schema`] binds a column family of the [`DB`](crate::DB) to a key type ([`KeyCodec`]) and a
/// value type ([`ValueCodec`]).
pub trait Schema: Debug + Send + Sync + 'static + Sized + Default {
    /// The column family name associated with this struct.
    /// Note: all schemas opened by the same DB must have distinct column family names.
    const COLUMN_FAMILY_NAME: ColumnFamilyName;

    /// Type of the key.
    type Key: KeyCodec<Self>;

    /// Type of the value.
    type Value: ValueCodec<Self>;
}

/// A [`core::result::Result`] alias with [`CodecError`] as the error type.
pub type Result<T, E = CodecError> = core::result::Result<T, E>;

/// Marker trait for types that can serve as a [`Schema::Key`].
///
/// It has a blanket implementation for all types that are both [`KeyEncoder`] and
/// [`KeyDecoder`]. Keeping the two halves apart lets seek-only or borrowed key forms implement
/// just the encoder:
///
/// ```rust
/// use anyhow::Context;
///
/// use rollapp_keeper::define_schema;
/// use rollapp_keeper::schema::{KeyDecoder, KeyEncoder, Result, ValueCodec};
///
/// define_schema!(HeightByRollapp, String, u64, "height_by_rollapp");
///
/// impl KeyEncoder<HeightByRollapp> for String {
///     fn encode_key(&self) -> Result<Vec<u8>> {
///         Ok(self.as_bytes().to_vec())
///     }
/// }
///
/// impl KeyDecoder<HeightByRollapp> for String {
///     fn decode_key(data: &[u8]) -> Result<Self> {
///         Ok(String::from_utf8(data.to_vec()).context("Can't read key")?)
///     }
/// }
///
/// impl ValueCodec<HeightByRollapp> for u64 {
///     fn encode_value(&self) -> Result<Vec<u8>> {
///         Ok(self.to_be_bytes().to_vec())
///     }
///
///     fn decode_value(data: &[u8]) -> Result<Self> {
///         let bytes: [u8; 8] = data.try_into().context("Can't read height")?;
///         Ok(u64::from_be_bytes(bytes))
///     }
/// }
/// ```
pub trait KeyCodec<S: Schema + ?Sized>: KeyEncoder<S> + KeyDecoder<S> {}

impl<T, S: Schema + ?Sized> KeyCodec<S> for T where T: KeyEncoder<S> + KeyDecoder<S> {}

/// Implementors of this trait can be used to encode keys in the given [`Schema`].
pub trait KeyEncoder<S: Schema + ?Sized>: Sized + Debug {
    /// Converts `self` to bytes to be stored in RocksDB.
    fn encode_key(&self) -> Result<Vec<u8>>;
}

impl<S: Schema, T: KeyEncoder<S>> KeyEncoder<S> for &T {
    fn encode_key(&self) -> Result<Vec<u8>> {
        (*self).encode_key()
    }
}

/// Implementors of this trait can be used to decode keys in the given [`Schema`].
pub trait KeyDecoder<S: Schema + ?Sized>: Sized + Debug {
    /// Converts bytes fetched from RocksDB to `Self`.
    fn decode_key(data: &[u8]) -> Result<Self>;
}

/// This trait defines a type that can serve as a [`Schema::Value`].
pub trait ValueCodec<S: Schema + ?Sized>: Sized + Debug {
    /// Converts `self` to bytes to be stored in DB.
    fn encode_value(&self) -> Result<Vec<u8>>;
    /// Converts bytes fetched from DB to `Self`.
    fn decode_value(data: &[u8]) -> Result<Self>;
}

/// Defines a [`Schema`] implementor from its name, key type, value type and column family name.
/// Attributes (including doc comments) placed before the name are forwarded to the generated
/// struct. The codecs for the key and value types still have to be implemented by hand, see
/// [`KeyCodec`].
#[macro_export]
macro_rules! define_schema {
    ($(#[$meta:meta])* $schema_type:ident, $key_type:ty, $value_type:ty, $cf_name:expr) => {
        $(#[$meta])*
        #[derive(Debug, Default)]
        pub struct $schema_type;

        impl $crate::schema::Schema for $schema_type {
            type Key = $key_type;
            type Value = $value_type;

            const COLUMN_FAMILY_NAME: $crate::schema::ColumnFamilyName = $cf_name;
        }
    };
}
