use std::iter::FusedIterator;
use std::marker::PhantomData;

use anyhow::Result;

use crate::metrics::{SCHEMADB_ITER_BYTES, SCHEMADB_ITER_LATENCY_SECONDS};
use crate::schema::{KeyDecoder, Schema, ValueCodec};
use crate::SchemaKey;

/// This defines a type that can be used to seek a [`SchemaIterator`], via
/// interfaces like [`SchemaIterator::seek`].
///
/// If `self` is also a [`KeyEncoder`](crate::schema::KeyEncoder), then
/// [`SeekKeyEncoder::encode_seek_key`] MUST return the same bytes as
/// [`KeyEncoder::encode_key`](crate::schema::KeyEncoder::encode_key).
pub trait SeekKeyEncoder<S: Schema>: Sized {
    /// Converts `self` to bytes which is used to seek the underlying raw
    /// iterator.
    fn encode_seek_key(&self) -> crate::schema::Result<Vec<u8>>;
}

/// Indicates in which direction iterator should be scanned.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ScanDirection {
    Forward,
    Backward,
}

/// DB Iterator parameterized on [`Schema`] that seeks with [`Schema::Key`] and yields
/// [`Schema::Key`] and [`Schema::Value`] pairs.
pub struct SchemaIterator<'a, S> {
    db_iter: rocksdb::DBRawIterator<'a>,
    direction: ScanDirection,
    phantom: PhantomData<S>,
}

impl<'a, S> SchemaIterator<'a, S>
where
    S: Schema,
{
    pub(crate) fn new(db_iter: rocksdb::DBRawIterator<'a>, direction: ScanDirection) -> Self {
        let mut iter = SchemaIterator {
            db_iter,
            direction,
            phantom: PhantomData,
        };

        // The raw iterator is unpositioned until the first seek.
        match direction {
            ScanDirection::Forward => iter.seek_to_first(),
            ScanDirection::Backward => iter.seek_to_last(),
        };

        iter
    }

    /// Seeks to the first key.
    pub fn seek_to_first(&mut self) {
        self.db_iter.seek_to_first();
    }

    /// Seeks to the last key.
    pub fn seek_to_last(&mut self) {
        self.db_iter.seek_to_last();
    }

    /// Seeks to the first key whose binary representation is equal to or greater than that of the
    /// `seek_key`.
    pub fn seek(&mut self, seek_key: &impl SeekKeyEncoder<S>) -> Result<()> {
        let key = seek_key.encode_seek_key()?;
        self.db_iter.seek(&key);
        Ok(())
    }

    /// Seeks to the last key whose binary representation is less than or equal to that of the
    /// `seek_key`.
    pub fn seek_for_prev(&mut self, seek_key: &impl SeekKeyEncoder<S>) -> Result<()> {
        let key = seek_key.encode_seek_key()?;
        self.db_iter.seek_for_prev(&key);
        Ok(())
    }

    /// Returns the encoded key the iterator is positioned at, without decoding it or moving.
    /// `None` once the iterator is exhausted.
    pub(crate) fn peek_raw_key(&self) -> Result<Option<SchemaKey>> {
        // `key()` must only be called on a valid iterator; an invalid one may carry an error.
        if !self.db_iter.valid() {
            self.db_iter.status()?;
            return Ok(None);
        }
        Ok(self.db_iter.key().map(<[u8]>::to_vec))
    }

    /// Moves past the current entry without decoding it. No-op on an exhausted iterator.
    pub(crate) fn advance(&mut self) {
        if !self.db_iter.valid() {
            return;
        }
        match self.direction {
            ScanDirection::Forward => self.db_iter.next(),
            ScanDirection::Backward => self.db_iter.prev(),
        }
    }

    pub(crate) fn next_impl(&mut self) -> Result<Option<IteratorOutput<S::Key, S::Value>>> {
        let _timer = SCHEMADB_ITER_LATENCY_SECONDS
            .with_label_values(&[S::COLUMN_FAMILY_NAME])
            .start_timer();

        if !self.db_iter.valid() {
            self.db_iter.status()?;
            return Ok(None);
        }

        let (raw_key, raw_value) = match self.db_iter.item() {
            Some(item) => item,
            None => return Ok(None),
        };
        SCHEMADB_ITER_BYTES
            .with_label_values(&[S::COLUMN_FAMILY_NAME])
            .observe((raw_key.len() + raw_value.len()) as f64);

        let key = <S::Key as KeyDecoder<S>>::decode_key(raw_key)?;
        let value = <S::Value as ValueCodec<S>>::decode_value(raw_value)?;

        self.advance();

        Ok(Some(IteratorOutput { key, value }))
    }
}

/// A decoded entry yielded by [`SchemaIterator`].
#[derive(Debug)]
pub struct IteratorOutput<K, V> {
    /// Decoded key.
    pub key: K,
    /// Decoded value.
    pub value: V,
}

impl<S> Iterator for SchemaIterator<'_, S>
where
    S: Schema,
{
    type Item = Result<IteratorOutput<S::Key, S::Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_impl().transpose()
    }
}

impl<S> FusedIterator for SchemaIterator<'_, S> where S: Schema {}
