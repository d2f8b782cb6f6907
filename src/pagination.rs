//! Offset- or cursor-based pagination over a [`Schema`].
//!
//! Both modes walk the column family in encoded-key order (descending with
//! [`PageRequest::reverse`]), so a caller paging through by offset sees exactly the same records
//! in the same order as a caller following [`PageResponse::next_key`]. The cursor is the encoded
//! key of the first record not yet returned.

use std::num::NonZeroU64;

use thiserror::Error;
use tracing::debug;

use crate::metrics::QUERY_PAGE_SIZE;
use crate::schema::Schema;
use crate::types::{PageRequest, PageResponse};
use crate::{SchemaIterator, SeekKeyEncoder, DB};

/// Errors returned by [`paginate`].
#[derive(Error, Debug)]
pub enum PaginationError {
    /// Both a cursor and an offset were supplied.
    #[error("invalid request, either offset or key is expected, got both")]
    KeyAndOffset,
    /// Iterating the store or handling a record failed.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Seeks to a raw cursor, whatever the schema's key type.
struct Cursor<'a>(&'a [u8]);

impl<S: Schema> SeekKeyEncoder<S> for Cursor<'_> {
    fn encode_seek_key(&self) -> crate::schema::Result<Vec<u8>> {
        Ok(self.0.to_vec())
    }
}

/// Collects one page of `S` records according to `page_request`, handing each record to
/// `on_result` in iteration order.
///
/// A missing request is treated as [`PageRequest::default`]. A zero `limit` is replaced by
/// `default_limit` and turns on `count_total`. With a cursor, the page starts at the cursor itself
/// (or the greatest key below it when reversed) and no total is computed. With an offset, records
/// before the offset are skipped, and with `count_total` the whole column family is walked to
/// fill [`PageResponse::total`]. Skipped and counted records are never decoded.
pub fn paginate<S, F>(
    db: &DB,
    page_request: Option<&PageRequest>,
    default_limit: NonZeroU64,
    mut on_result: F,
) -> Result<PageResponse, PaginationError>
where
    S: Schema,
    F: FnMut(S::Key, S::Value) -> anyhow::Result<()>,
{
    let default_request = PageRequest::default();
    let page_request = page_request.unwrap_or(&default_request);

    let offset = page_request.offset;
    let mut limit = page_request.limit;
    let mut count_total = page_request.count_total;
    let reverse = page_request.reverse;

    if offset > 0 && !page_request.key.is_empty() {
        return Err(PaginationError::KeyAndOffset);
    }
    if limit == 0 {
        limit = default_limit.get();
        count_total = true;
    }

    let response = if page_request.key.is_empty() {
        let iter = open_iterator::<S>(db, None, reverse)?;
        paginate_by_offset(iter, offset, limit, count_total, &mut on_result)?
    } else {
        let iter = open_iterator::<S>(db, Some(&page_request.key), reverse)?;
        paginate_by_key(iter, limit, &mut on_result)?
    };

    debug!(
        cf_name = S::COLUMN_FAMILY_NAME,
        offset,
        limit,
        reverse,
        has_next = !response.next_key.is_empty(),
        total = response.total,
        "Paginated query"
    );
    Ok(response)
}

/// Opens an iterator positioned at `start` (inclusive), or at the first record of the scan
/// direction when there is no cursor.
fn open_iterator<'a, S: Schema>(
    db: &'a DB,
    start: Option<&[u8]>,
    reverse: bool,
) -> anyhow::Result<SchemaIterator<'a, S>> {
    let mut iter = if reverse {
        db.rev_iter::<S>()?
    } else {
        db.iter::<S>()?
    };
    match (start, reverse) {
        (Some(key), false) => iter.seek(&Cursor(key))?,
        (Some(key), true) => iter.seek_for_prev(&Cursor(key))?,
        (None, _) => {}
    }
    Ok(iter)
}

fn paginate_by_key<S, F>(
    mut iter: SchemaIterator<'_, S>,
    limit: u64,
    on_result: &mut F,
) -> anyhow::Result<PageResponse>
where
    S: Schema,
    F: FnMut(S::Key, S::Value) -> anyhow::Result<()>,
{
    let mut count = 0u64;
    let mut next_key = Vec::new();
    while let Some(raw_key) = iter.peek_raw_key()? {
        if count == limit {
            next_key = raw_key;
            break;
        }
        if let Some(item) = iter.next_impl()? {
            on_result(item.key, item.value)?;
        }
        count += 1;
    }
    QUERY_PAGE_SIZE
        .with_label_values(&[S::COLUMN_FAMILY_NAME])
        .observe(count as f64);

    Ok(PageResponse { next_key, total: 0 })
}

fn paginate_by_offset<S, F>(
    mut iter: SchemaIterator<'_, S>,
    offset: u64,
    limit: u64,
    count_total: bool,
    on_result: &mut F,
) -> anyhow::Result<PageResponse>
where
    S: Schema,
    F: FnMut(S::Key, S::Value) -> anyhow::Result<()>,
{
    let end = offset.saturating_add(limit);
    let mut count = 0u64;
    let mut next_key = Vec::new();
    while let Some(raw_key) = iter.peek_raw_key()? {
        count += 1;
        if count > offset && count <= end {
            if let Some(item) = iter.next_impl()? {
                on_result(item.key, item.value)?;
            }
            continue;
        }
        if count == end.saturating_add(1) {
            next_key = raw_key;
            if !count_total {
                break;
            }
        }
        iter.advance();
    }
    QUERY_PAGE_SIZE
        .with_label_values(&[S::COLUMN_FAMILY_NAME])
        .observe(count.saturating_sub(offset).min(limit) as f64);

    Ok(PageResponse {
        next_key,
        total: if count_total { count } else { 0 },
    })
}
