//! Sled-backed hint store.
//!
//! One tree holds every hint. Key layout is `target_id (16) ++ hint_id (16)
//! ++ message_version (4, BE)`, so lexicographic order is (partition, insert
//! time, version) and a prefix scan pages one partition oldest-first.

use std::ops::Bound;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use prost::Message;
use tracing::debug;
use tracing::error;
use tracing::info;
use uuid::Uuid;

use super::DeleteKey;
use super::HintId;
use super::HintKey;
use super::HintPage;
use super::HintRow;
use super::HintStore;
use super::HintStoreStats;
use super::PageCursor;
use super::TargetId;
use crate::constants::HINTS_TREE;
use crate::utils::time::hint_expired;
use crate::utils::time::now_ms;
use crate::Result;
use crate::StorageError;

const KEY_LEN: usize = 16 + 16 + 4;

/// Durable envelope around the mutation payload. Writetime and TTL are
/// record metadata set once at insert; records are immutable after that.
#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct StoredHint {
    #[prost(int64, tag = "1")]
    pub(crate) writetime_ms: i64,

    #[prost(uint32, tag = "2")]
    pub(crate) ttl_secs: u32,

    #[prost(bytes = "vec", tag = "3")]
    pub(crate) mutation: ::prost::alloc::vec::Vec<u8>,
}

pub struct SledHintStore {
    tree: Arc<sled::Tree>,
    /// (rows, bytes) per partition; rebuilt from disk on open.
    partitions: DashMap<TargetId, (u64, u64)>,
    /// Shared v7 context: ids handed out within the same millisecond stay
    /// monotonic, which the oldest-first scan order depends on.
    id_context: std::sync::Mutex<uuid::timestamp::context::ContextV7>,
}

impl std::fmt::Debug for SledHintStore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SledHintStore").field("tree_len", &self.tree.len()).finish()
    }
}

impl Drop for SledHintStore {
    fn drop(&mut self) {
        match self.tree.flush() {
            Ok(_) => info!("Successfully flush HintStore"),
            Err(e) => error!(?e, "Failed to flush HintStore"),
        }
    }
}

impl SledHintStore {
    pub fn new(db: &sled::Db) -> Result<Self> {
        let tree = db.open_tree(HINTS_TREE).map_err(StorageError::Engine)?;
        let store = Self {
            tree: Arc::new(tree),
            partitions: DashMap::new(),
            id_context: std::sync::Mutex::new(uuid::timestamp::context::ContextV7::new()),
        };
        store.rebuild_partition_stats()?;
        Ok(store)
    }

    fn rebuild_partition_stats(&self) -> Result<()> {
        for item in self.tree.iter() {
            let (key, value) = item.map_err(StorageError::Engine)?;
            let hint_key = decode_key(&key)?;
            let mut entry = self.partitions.entry(hint_key.target_id).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += value.len() as u64;
        }
        debug!("HintStore opened with {} pending target(s)", self.partitions.len());
        Ok(())
    }

    /// Raw keyed write; `insert` layers id and writetime assignment on top.
    pub(crate) fn put_hint(
        &self,
        key: &HintKey,
        writetime_ms: i64,
        ttl_secs: u32,
        mutation: &[u8],
    ) -> Result<()> {
        let stored = StoredHint {
            writetime_ms,
            ttl_secs,
            mutation: mutation.to_vec(),
        };
        let value = stored.encode_to_vec();
        let value_len = value.len() as u64;

        let previous = self.tree.insert(encode_key(key), value).map_err(StorageError::Engine)?;

        let mut entry = self.partitions.entry(key.target_id).or_insert((0, 0));
        match previous {
            Some(prev) => entry.1 = entry.1.saturating_sub(prev.len() as u64) + value_len,
            None => {
                entry.0 += 1;
                entry.1 += value_len;
            }
        }
        Ok(())
    }

    fn forget_row(
        &self,
        target_id: TargetId,
        value_len: u64,
    ) {
        if let Some(mut entry) = self.partitions.get_mut(&target_id) {
            entry.0 = entry.0.saturating_sub(1);
            entry.1 = entry.1.saturating_sub(value_len);
            let emptied = entry.0 == 0;
            drop(entry);
            if emptied {
                self.partitions.remove_if(&target_id, |_, (rows, _)| *rows == 0);
            }
        }
    }
}

impl HintStore for SledHintStore {
    fn insert(
        &self,
        target_id: TargetId,
        message_version: i32,
        mutation: Bytes,
        ttl_secs: u32,
    ) -> Result<HintId> {
        if ttl_secs == 0 {
            return Err(StorageError::Validation("hint ttl must be positive".into()).into());
        }
        if message_version <= 0 {
            return Err(
                StorageError::Validation(format!("invalid message version {message_version}")).into(),
            );
        }

        let hint_id = {
            let ctx = self.id_context.lock().unwrap();
            Uuid::new_v7(uuid::Timestamp::now(&*ctx))
        };
        let key = HintKey {
            target_id,
            hint_id,
            message_version,
        };
        self.put_hint(&key, now_ms(), ttl_secs, &mutation)?;
        Ok(hint_id)
    }

    fn scan_page(
        &self,
        target_id: TargetId,
        page_size: usize,
        cursor: Option<PageCursor>,
    ) -> Result<HintPage> {
        if page_size == 0 {
            return Err(StorageError::Validation("page_size must be positive".into()).into());
        }

        let prefix = *target_id.as_bytes();
        // The scan restarts strictly after the cursor key, hence the
        // lower page-size bound of 2 upstream.
        let start: Bound<Vec<u8>> = match &cursor {
            Some(c) => Bound::Excluded(c.0.clone()),
            None => Bound::Included(prefix.to_vec()),
        };

        let mut rows = Vec::with_capacity(page_size);
        let mut last_key: Option<Vec<u8>> = None;

        for item in self.tree.range((start, Bound::Unbounded)) {
            let (key, value) = item.map_err(StorageError::Engine)?;
            if !key.starts_with(&prefix) {
                break;
            }

            let hint_key = decode_key(&key)?;
            let stored = StoredHint::decode(value.as_ref())
                .map_err(|e| StorageError::RecordDecode(format!("hint {}: {e}", hint_key.hint_id)))?;

            rows.push(HintRow {
                key: hint_key,
                mutation: Bytes::from(stored.mutation),
                writetime_ms: stored.writetime_ms,
                ttl_secs: stored.ttl_secs,
            });
            last_key = Some(key.to_vec());

            if rows.len() == page_size {
                break;
            }
        }

        let next = if rows.len() == page_size {
            last_key.map(PageCursor)
        } else {
            None
        };
        Ok(HintPage { rows, next })
    }

    fn delete(
        &self,
        key: &DeleteKey,
    ) -> Result<()> {
        let raw = encode_key(&key.key);
        loop {
            let Some(current) = self.tree.get(&raw).map_err(StorageError::Engine)? else {
                return Ok(()); // already gone
            };
            let stored = StoredHint::decode(current.as_ref())
                .map_err(|e| StorageError::RecordDecode(format!("hint {}: {e}", key.key.hint_id)))?;

            // A concurrent re-insert with a newer writetime must survive a
            // late delete of the older incarnation.
            if stored.writetime_ms > key.writetime_ms {
                return Ok(());
            }

            let value_len = current.len() as u64;
            match self
                .tree
                .compare_and_swap(&raw, Some(current), None::<&[u8]>)
                .map_err(StorageError::Engine)?
            {
                Ok(()) => {
                    self.forget_row(key.key.target_id, value_len);
                    return Ok(());
                }
                Err(_) => continue, // raced with a writer, re-read
            }
        }
    }

    fn delete_all(
        &self,
        target_id: TargetId,
    ) -> Result<()> {
        let prefix = *target_id.as_bytes();
        for item in self.tree.scan_prefix(prefix) {
            let (key, _) = item.map_err(StorageError::Engine)?;
            self.tree.remove(key).map_err(StorageError::Engine)?;
        }
        self.partitions.remove(&target_id);
        Ok(())
    }

    fn truncate(&self) -> Result<()> {
        self.tree.clear().map_err(StorageError::Engine)?;
        self.partitions.clear();
        Ok(())
    }

    fn distinct_targets(&self) -> Result<Vec<TargetId>> {
        Ok(self.partitions.iter().map(|entry| *entry.key()).collect())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.tree.is_empty())
    }

    fn flush(&self) -> Result<()> {
        self.tree.flush().map_err(StorageError::Engine)?;
        Ok(())
    }

    fn compact(&self) -> Result<()> {
        let now = now_ms();
        let mut purged = 0u64;

        for item in self.tree.iter() {
            let (key, value) = item.map_err(StorageError::Engine)?;
            let Ok(stored) = StoredHint::decode(value.as_ref()) else {
                continue; // leave undecodable rows for the scan path to report
            };
            if hint_expired(stored.writetime_ms, stored.ttl_secs, now) {
                if self.tree.remove(&key).map_err(StorageError::Engine)?.is_some() {
                    let hint_key = decode_key(&key)?;
                    self.forget_row(hint_key.target_id, value.len() as u64);
                    purged += 1;
                }
            }
        }

        if purged > 0 {
            debug!("Hint compaction purged {} expired row(s)", purged);
        }
        self.flush()
    }

    fn stats(&self) -> HintStoreStats {
        let parts = self.partitions.len() as u64;
        if parts == 0 {
            return HintStoreStats::default();
        }

        let (total_rows, total_bytes) = self
            .partitions
            .iter()
            .fold((0u64, 0u64), |(r, b), entry| (r + entry.value().0, b + entry.value().1));

        HintStoreStats {
            mean_row_bytes: total_bytes / parts,
            mean_columns: total_rows / parts,
        }
    }
}

fn encode_key(key: &HintKey) -> [u8; KEY_LEN] {
    let mut raw = [0u8; KEY_LEN];
    raw[..16].copy_from_slice(key.target_id.as_bytes());
    raw[16..32].copy_from_slice(key.hint_id.as_bytes());
    raw[32..].copy_from_slice(&(key.message_version as u32).to_be_bytes());
    raw
}

fn decode_key(raw: &[u8]) -> Result<HintKey> {
    if raw.len() != KEY_LEN {
        return Err(StorageError::RecordDecode(format!("hint key of length {}", raw.len())).into());
    }

    let target_id = Uuid::from_slice(&raw[..16])
        .map_err(|e| StorageError::RecordDecode(format!("target id: {e}")))?;
    let hint_id = Uuid::from_slice(&raw[16..32])
        .map_err(|e| StorageError::RecordDecode(format!("hint id: {e}")))?;
    let message_version = u32::from_be_bytes(raw[32..].try_into().expect("length checked")) as i32;

    Ok(HintKey {
        target_id,
        hint_id,
        message_version,
    })
}
