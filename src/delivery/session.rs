//! Per-target delivery session.
//!
//! One session pages through every hint stored for one peer, filters stale
//! and obsolete entries, dispatches the remaining mutations, waits for each
//! page's acknowledgements, deletes confirmed hints, and compacts the store
//! on the way out. The session is the error boundary: most conditions inside
//! it convert to "abort this attempt" and the next scheduled sweep resumes
//! where this one stopped.

use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::time::sleep;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::codec::strip_truncated;
use crate::codec::TruncationCache;
use crate::constants::MAX_PAGE_SIZE;
use crate::constants::MIN_PAGE_SIZE;
use crate::constants::SCHEMA_POLL_INTERVAL;
use crate::utils::time::hint_expired;
use crate::utils::time::now_ms;
use crate::CodecError;
use crate::DeliveryThrottle;
use crate::Error;
use crate::FailureDetector;
use crate::HandoffNodeConfig;
use crate::HintSender;
use crate::HintStore;
use crate::Membership;
use crate::MutationCodec;
use crate::Result;
use crate::SchemaGossip;
use crate::TableRegistry;
use crate::REPLAYED_HINTS;

/// Terminal state of one delivery attempt. Skips and aborts are ordinary
/// outcomes, not errors; the periodic sweep is the retry mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Every stored hint was replayed or filtered.
    Completed { replayed: u64 },
    /// Preflight decided there was nothing to attempt.
    Skipped(SkipReason),
    /// The attempt stopped partway; already-confirmed deletions stand.
    Aborted { reason: AbortReason, replayed: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    StoreEmpty,
    SchemaDisagreement,
    UnknownHost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    Paused,
    TargetDied,
    WriteTimeout,
    WriteFailed,
}

impl SessionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SessionOutcome::Completed { .. } => "completed",
            SessionOutcome::Skipped(SkipReason::StoreEmpty) => "store_empty",
            SessionOutcome::Skipped(SkipReason::SchemaDisagreement) => "schema_disagreement",
            SessionOutcome::Skipped(SkipReason::UnknownHost) => "unknown_host",
            SessionOutcome::Aborted {
                reason: AbortReason::Paused,
                ..
            } => "paused",
            SessionOutcome::Aborted {
                reason: AbortReason::TargetDied,
                ..
            } => "target_died",
            SessionOutcome::Aborted {
                reason: AbortReason::WriteTimeout,
                ..
            } => "write_timeout",
            SessionOutcome::Aborted {
                reason: AbortReason::WriteFailed,
                ..
            } => "write_failed",
        }
    }
}

struct SchemaWaitTimeout;

pub(crate) struct DeliverySession {
    pub(crate) config: HandoffNodeConfig,
    pub(crate) store: Arc<dyn HintStore>,
    pub(crate) registry: Arc<dyn TableRegistry>,
    pub(crate) codec: MutationCodec,
    pub(crate) membership: Arc<dyn Membership>,
    pub(crate) detector: Arc<dyn FailureDetector>,
    pub(crate) gossip: Arc<dyn SchemaGossip>,
    pub(crate) sender: Arc<dyn HintSender>,
    pub(crate) paused: Arc<AtomicBool>,
}

impl DeliverySession {
    pub(crate) async fn run(
        &self,
        endpoint: SocketAddr,
    ) -> Result<SessionOutcome> {
        if self.store.is_empty()? {
            // nothing to do, don't confuse users by logging a no-op handoff
            return Ok(SessionOutcome::Skipped(SkipReason::StoreEmpty));
        }

        if self.is_paused() {
            debug!("Hints delivery process is paused, aborting");
            return Ok(SessionOutcome::Aborted {
                reason: AbortReason::Paused,
                replayed: 0,
            });
        }

        debug!("Checking remote({}) schema before delivering hints", endpoint);
        if self.wait_for_schema_agreement(endpoint).await.is_err() {
            return Ok(SessionOutcome::Skipped(SkipReason::SchemaDisagreement));
        }

        if !self.detector.is_alive(endpoint) {
            debug!("Endpoint {} died before hint delivery, aborting", endpoint);
            return Ok(SessionOutcome::Aborted {
                reason: AbortReason::TargetDied,
                replayed: 0,
            });
        }

        self.deliver(endpoint).await
    }

    /*
     * 1. Resolve the stable id behind the endpoint
     * 2. Page through its hints oldest-first; deserialize and filter each row
     * 3. Dispatch the surviving mutations, then drain the page's acks
     * 4. Delete each hint once its write is acknowledged
     * 5. Flush + compact to clean up the deletes the replay produced
     */
    async fn deliver(
        &self,
        endpoint: SocketAddr,
    ) -> Result<SessionOutcome> {
        let Some(host_id) = self.membership.host_id(endpoint) else {
            warn!("No stable host id for endpoint {}, skipping hint delivery", endpoint);
            return Ok(SessionOutcome::Skipped(SkipReason::UnknownHost));
        };
        info!("Started hinted handoff for host: {} with IP: {}", host_id, endpoint);

        let replayed = Arc::new(AtomicU64::new(0));
        let page_size = self.page_size();
        debug!("Using pageSize of {}", page_size);

        // Rate is in bytes per second, scaled by the number of other nodes
        // in the cluster. A fresh throttle per session keeps the budget in
        // step with current membership.
        let mut throttle = DeliveryThrottle::per_target(
            self.config.handoff.throttle_in_kb,
            self.membership.all_endpoints().len(),
        );

        let mut cursor = None;
        let mut finished = false;
        let mut abort: Option<AbortReason> = None;

        'delivery: loop {
            let page = self.store.scan_page(host_id, page_size, cursor.take())?;
            if page.rows.is_empty() {
                finished = true;
                break;
            }
            cursor = page.next;

            let mut truncation_cache = TruncationCache::new();
            let mut inflight = FuturesUnordered::new();

            for row in page.rows {
                if self.is_paused() {
                    debug!("Hints delivery process is paused, aborting");
                    abort = Some(AbortReason::Paused);
                    break 'delivery;
                }
                if !self.detector.is_alive(endpoint) {
                    info!(
                        "Endpoint {} died during hint delivery; aborting ({} delivered)",
                        endpoint,
                        replayed.load(Ordering::Acquire)
                    );
                    abort = Some(AbortReason::TargetDied);
                    break 'delivery;
                }

                // Tombstone residue: the row outlived its TTL but has not
                // been purged yet.
                if hint_expired(row.writetime_ms, row.ttl_secs, now_ms()) {
                    continue;
                }

                let mutation = match self.codec.deserialize(&row.mutation, row.key.message_version) {
                    Ok(mutation) => mutation,
                    Err(CodecError::UnknownColumnFamily(cf_id)) => {
                        debug!("Skipping delivery of hint for deleted column family {}", cf_id);
                        self.store.delete(&row.delete_key())?;
                        continue;
                    }
                    Err(e) => {
                        // data on disk does not parse; nothing a retry can fix
                        return Err(Error::Fatal(format!(
                            "corrupt hint {} for target {}: {e}",
                            row.key.hint_id, host_id
                        )));
                    }
                };

                let mutation =
                    strip_truncated(mutation, row.writetime_ms, self.registry.as_ref(), &mut truncation_cache);
                if mutation.is_empty() {
                    self.store.delete(&row.delete_key())?;
                    continue;
                }

                throttle.acquire(mutation.serialized_size() as u64).await;

                let payload = self
                    .codec
                    .serialize(&mutation, row.key.message_version)
                    .map_err(|e| Error::Fatal(format!("re-encode of hint {} failed: {e}", row.key.hint_id)))?;

                // The completion handler owns only the delete-key tuple, not
                // the row, and may fire after the session aborts; the delete
                // stays safe because it is guarded by the row's writetime.
                let delete_key = row.delete_key();
                let message_version = row.key.message_version;
                let store = Arc::clone(&self.store);
                let sender = Arc::clone(&self.sender);
                let counter = Arc::clone(&replayed);
                inflight.push(tokio::spawn(async move {
                    match sender.send_mutation(endpoint, message_version, payload).await {
                        Ok(()) => {
                            counter.fetch_add(1, Ordering::AcqRel);
                            REPLAYED_HINTS.inc();
                            if let Err(e) = store.delete(&delete_key) {
                                warn!("Failed to delete delivered hint {}: {:?}", delete_key.key.hint_id, e);
                            }
                            Ok(())
                        }
                        Err(e) => Err(e),
                    }
                }));
            }

            // Drain every outstanding acknowledgement before advancing the
            // cursor; partial delivery is acceptable, the next attempt resumes.
            while let Some(result) = inflight.next().await {
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) if e.is_timeout() => {
                        info!(
                            "Timed out replaying hints to {}; aborting ({} delivered)",
                            endpoint,
                            replayed.load(Ordering::Acquire)
                        );
                        abort.get_or_insert(AbortReason::WriteTimeout);
                    }
                    Ok(Err(e)) => {
                        warn!("Hint write to {} failed: {}", endpoint, e);
                        abort.get_or_insert(AbortReason::WriteFailed);
                    }
                    Err(e) => {
                        error!("Hint dispatch task failed: {:?}", e);
                        abort.get_or_insert(AbortReason::WriteFailed);
                    }
                }
            }
            if abort.is_some() {
                break;
            }
            if cursor.is_none() {
                finished = true;
                break;
            }
        }

        let replayed_total = replayed.load(Ordering::Acquire);

        // Bound the tombstone accumulation the replay itself produced.
        if finished || replayed_total >= self.config.handoff.tombstone_warn_threshold {
            self.store.flush()?;
            self.store.compact()?;
        }

        match abort {
            Some(reason) => Ok(SessionOutcome::Aborted {
                reason,
                replayed: replayed_total,
            }),
            None => {
                info!("Finished hinted handoff of {} rows to endpoint {}", replayed_total, endpoint);
                Ok(SessionOutcome::Completed {
                    replayed: replayed_total,
                })
            }
        }
    }

    /// Read fewer hints per page when they are very large.
    pub(crate) fn page_size(&self) -> usize {
        let stats = self.store.stats();
        if stats.mean_columns > 0 {
            let average_hint_size = (stats.mean_row_bytes / stats.mean_columns).max(1);
            let budget = self.config.handoff.in_memory_compaction_limit_in_bytes / average_hint_size;
            (budget as usize).clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
        } else {
            MAX_PAGE_SIZE
        }
    }

    /// Two sequential waits, each bounded by `2 x ring_delay`: first for the
    /// target to publish any schema state at all, then for its published
    /// version to equal ours. A timeout silently skips this delivery; the
    /// next sweep retries.
    async fn wait_for_schema_agreement(
        &self,
        endpoint: SocketAddr,
    ) -> std::result::Result<(), SchemaWaitTimeout> {
        let bound = Duration::from_millis(2 * self.config.cluster.ring_delay_in_ms);

        let mut waited = Duration::ZERO;
        while self.gossip.schema_version(endpoint).is_none() {
            if !self.gossip.endpoint_known(endpoint) {
                debug!("Node {} vanished while waiting for agreement", endpoint);
                return Err(SchemaWaitTimeout);
            }
            sleep(SCHEMA_POLL_INTERVAL).await;
            waited += SCHEMA_POLL_INTERVAL;
            if waited > bound {
                debug!("Didn't receive gossiped schema from {} in {:?}", endpoint, bound);
                return Err(SchemaWaitTimeout);
            }
        }

        let mut waited = Duration::ZERO;
        loop {
            if !self.gossip.endpoint_known(endpoint) {
                debug!("Node {} vanished while waiting for agreement", endpoint);
                return Err(SchemaWaitTimeout);
            }
            let local = self.gossip.local_schema_version();
            if local.is_some() && self.gossip.schema_version(endpoint) == local {
                break;
            }
            sleep(SCHEMA_POLL_INTERVAL).await;
            waited += SCHEMA_POLL_INTERVAL;
            if waited > bound {
                debug!("Could not reach schema agreement with {} in {:?}", endpoint, bound);
                return Err(SchemaWaitTimeout);
            }
        }

        debug!("schema for {} matches local schema", endpoint);
        Ok(())
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }
}
