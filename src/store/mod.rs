//! Durable hint storage.
//!
//! Hints are keyed by the target peer's stable id; all hints for one peer
//! live together and page out oldest-first. The trait is the narrow contract
//! the delivery pipeline consumes; [`SledHintStore`] is the production
//! implementation.

mod sled_hint_store;

pub use sled_hint_store::*;


use std::path::Path;

use bytes::Bytes;
#[cfg(test)]
use mockall::automock;
use tracing::debug;
use tracing::warn;
use uuid::Uuid;

use crate::Result;

/// Stable peer identity; the partition key of the hint table.
pub type TargetId = Uuid;

/// Time-ordered unique hint identifier (UUIDv7), assigned on insert. Doubles
/// as the clustering key and the logical insert-order of the hint.
pub type HintId = Uuid;

/// Composite primary key of one hint record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HintKey {
    pub target_id: TargetId,
    pub hint_id: HintId,
    pub message_version: i32,
}

/// One persisted hint, as read back by a page scan.
#[derive(Debug, Clone)]
pub struct HintRow {
    pub key: HintKey,
    pub mutation: Bytes,
    /// Store-assigned insert timestamp, epoch milliseconds. Doubles as the
    /// conflict-resolution value for deletes.
    pub writetime_ms: i64,
    /// The TTL the hint was written with, in seconds.
    pub ttl_secs: u32,
}

impl HintRow {
    /// The tuple a delivery callback needs to confirm this hint. Deliberately
    /// small: the completion handler must not own the full row across the
    /// acknowledgement await.
    pub fn delete_key(&self) -> DeleteKey {
        DeleteKey {
            key: self.key,
            writetime_ms: self.writetime_ms,
        }
    }
}

/// Key plus the writetime the delete is conditioned on: a row re-inserted
/// with a newer writetime survives a late delete carrying the older one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteKey {
    pub key: HintKey,
    pub writetime_ms: i64,
}

/// Opaque resume point for a page scan; the next page starts strictly after
/// this key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor(pub(crate) Vec<u8>);

#[derive(Debug, Default)]
pub struct HintPage {
    /// Oldest-first by hint id.
    pub rows: Vec<HintRow>,
    /// `None` once the partition is exhausted.
    pub next: Option<PageCursor>,
}

/// Per-partition size statistics backing adaptive page sizing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HintStoreStats {
    /// Mean partition size in bytes.
    pub mean_row_bytes: u64,
    /// Mean number of hints per partition.
    pub mean_columns: u64,
}

#[cfg_attr(test, automock)]
pub trait HintStore: Send + Sync + 'static {
    /// Appends a new hint with a fresh time-ordered id, recording the
    /// store-assigned writetime. Rejects a non-positive TTL or version.
    fn insert(
        &self,
        target_id: TargetId,
        message_version: i32,
        mutation: Bytes,
        ttl_secs: u32,
    ) -> Result<HintId>;

    /// Returns up to `page_size` hints for `target_id`, oldest first,
    /// starting strictly after `cursor`. Rows whose TTL has already lapsed
    /// may still be returned until a compaction purges them; callers skip
    /// them.
    fn scan_page(
        &self,
        target_id: TargetId,
        page_size: usize,
        cursor: Option<PageCursor>,
    ) -> Result<HintPage>;

    /// Idempotent, writetime-guarded point delete.
    fn delete(
        &self,
        key: &DeleteKey,
    ) -> Result<()>;

    /// Removes every hint stored for the peer.
    fn delete_all(
        &self,
        target_id: TargetId,
    ) -> Result<()>;

    /// Empties the store.
    fn truncate(&self) -> Result<()>;

    /// Every partition key currently present.
    fn distinct_targets(&self) -> Result<Vec<TargetId>>;

    fn is_empty(&self) -> Result<bool>;

    fn flush(&self) -> Result<()>;

    /// Purges expired rows and flushes; the post-delivery hygiene pass that
    /// bounds tombstone accumulation produced by the replay itself.
    fn compact(&self) -> Result<()>;

    fn stats(&self) -> HintStoreStats;
}

/// Opens the sled database backing the hint store.
pub fn init_sled_hints_db(
    db_root_path: impl AsRef<Path> + std::fmt::Debug
) -> std::result::Result<sled::Db, std::io::Error> {
    debug!("init_sled_hints_db from path: {:?}", &db_root_path);

    let hints_db_path = db_root_path.as_ref().join("hints");

    sled::Config::default()
        .path(&hints_db_path)
        .cache_capacity(10 * 1024 * 1024) //10MB
        .use_compression(true)
        .compression_factor(1)
        .mode(sled::Mode::HighThroughput)
        .open()
        .map_err(|e| {
            warn!("Try to open DB at this location: {:?} and failed: {:?}", hints_db_path, e);
            std::io::Error::other(e)
        })
}
