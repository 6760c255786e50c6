//! Hint TTL and truncation policy.

use std::collections::HashMap;

use uuid::Uuid;

use super::Mutation;
use super::TableRegistry;
use crate::CodecError;

/// Determine the TTL for a hint holding `mutation`.
///
/// This is the smallest grace period over the column families the mutation
/// touches, capped by the global ceiling, so that deletes are not "undone" by
/// delivery of an old hint. A non-positive result rejects the insert.
pub fn hint_ttl(
    mutation: &Mutation,
    registry: &dyn TableRegistry,
    max_hint_ttl_secs: u32,
) -> Result<u32, CodecError> {
    let mut ttl = max_hint_ttl_secs;
    for cf_id in mutation.column_family_ids() {
        match registry.grace_period_secs(cf_id) {
            Some(grace) => ttl = ttl.min(grace),
            None => return Err(CodecError::UnknownColumnFamily(cf_id)),
        }
    }

    if ttl == 0 {
        return Err(CodecError::NonPositiveTtl {
            keyspace: mutation.keyspace.clone(),
        });
    }
    Ok(ttl)
}

/// Per-page cache of column-family truncation times. Lazily filled so a page
/// full of hints for the same family hits the registry once.
#[derive(Default)]
pub(crate) struct TruncationCache {
    times: HashMap<Uuid, i64>,
}

impl TruncationCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn truncated_at_ms(
        &mut self,
        registry: &dyn TableRegistry,
        cf_id: Uuid,
    ) -> i64 {
        *self
            .times
            .entry(cf_id)
            .or_insert_with(|| registry.truncated_at_ms(cf_id).unwrap_or(i64::MIN))
    }
}

/// Strips every column family whose truncation time is later than the hint's
/// writetime. An emptied mutation signals the caller to delete the hint
/// without sending.
pub(crate) fn strip_truncated(
    mut mutation: Mutation,
    writetime_ms: i64,
    registry: &dyn TableRegistry,
    cache: &mut TruncationCache,
) -> Mutation {
    for cf_id in mutation.column_family_ids() {
        if writetime_ms < cache.truncated_at_ms(registry, cf_id) {
            tracing::debug!("Skipping delivery of hint for truncated column family {}", cf_id);
            mutation = mutation.without(cf_id);
        }
    }
    mutation
}
