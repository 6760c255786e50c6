//! The hinted handoff manager: an explicit handle over durable hint storage,
//! the delivery scheduler, and the operator control surface.
//!
//! Writes destined for an unreachable replica are stored here as hints and
//! replayed when the peer recovers. Delivery is at-least-once; the receiving
//! peer's mutation handling is idempotent by timestamp. There is no ordering
//! guarantee between hints for the same peer and no delivery guarantee
//! before a hint's TTL lapses.

mod builder;

pub use builder::*;


use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use autometrics::autometrics;
use dashmap::DashSet;
use tokio::sync::watch;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::codec::hint_ttl;
use crate::delivery::run_peer_event_loop;
use crate::delivery::run_sweep_loop;
use crate::delivery::DeliverySession;
use crate::Error;
use crate::FailureDetector;
use crate::HandoffNodeConfig;
use crate::HintSender;
use crate::HintStore;
use crate::Membership;
use crate::Mutation;
use crate::MutationCodec;
use crate::Result;
use crate::SchemaGossip;
use crate::TableRegistry;
use crate::TargetId;
use crate::API_SLO;
use crate::CREATED_HINTS;
use crate::CURRENT_MESSAGE_VERSION;
use crate::DELIVERY_SESSIONS;
use crate::NOT_STORED_HINTS;

/// Cloneable handle to the hinted handoff engine. The write path uses it to
/// store hints; the management surface uses it to pause, purge, and inspect.
#[derive(Clone)]
pub struct HintedHandoffManager {
    inner: Arc<HandoffInner>,
}

pub(crate) struct HandoffInner {
    pub(crate) config: HandoffNodeConfig,
    pub(crate) store: Arc<dyn HintStore>,
    pub(crate) registry: Arc<dyn TableRegistry>,
    pub(crate) codec: MutationCodec,
    pub(crate) membership: Arc<dyn Membership>,
    pub(crate) detector: Arc<dyn FailureDetector>,
    pub(crate) gossip: Arc<dyn SchemaGossip>,
    pub(crate) sender: Arc<dyn HintSender>,

    /// Global pause flag; sessions observe it at every page and row boundary.
    pub(crate) paused: Arc<AtomicBool>,
    /// Targets with an active or queued session. Admission goes through an
    /// atomic add-if-absent so at most one session runs per target.
    pub(crate) in_flight_targets: DashSet<SocketAddr>,
    /// Bounds concurrent delivery sessions at `max_hint_threads`.
    pub(crate) delivery_slots: Arc<Semaphore>,
}

/// Releases the in-flight entry on every session exit path.
struct InFlightGuard {
    inner: Arc<HandoffInner>,
    endpoint: SocketAddr,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.in_flight_targets.remove(&self.endpoint);
    }
}

impl HintedHandoffManager {
    pub(crate) fn from_inner(inner: HandoffInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn config(&self) -> &HandoffNodeConfig {
        &self.inner.config
    }

    /// Spawns the periodic sweep and the failure-detector event consumer.
    /// Both loops stop when `shutdown` fires.
    pub fn start(
        &self,
        shutdown: watch::Receiver<()>,
    ) -> Vec<JoinHandle<()>> {
        info!("Starting hinted handoff scheduler loops");
        let events = self.inner.detector.subscribe();
        vec![
            tokio::spawn(run_sweep_loop(self.clone(), shutdown.clone())),
            tokio::spawn(run_peer_event_loop(self.clone(), events, shutdown)),
        ]
    }

    /// Persists a hint for `target_id` so the mutation reaches it once the
    /// peer becomes available again.
    #[autometrics(objective = API_SLO)]
    pub fn store_hint(
        &self,
        target_id: TargetId,
        mutation: &Mutation,
    ) -> Result<()> {
        let ttl_secs = self.hint_ttl(mutation)?;

        // during tests we may not have a matching endpoint, but this would
        // be unexpected in real clusters
        match self.inner.membership.endpoint_for(target_id) {
            Some(endpoint) => {
                CREATED_HINTS.with_label_values(&[&endpoint.to_string()]).inc();
            }
            None => {
                warn!("Unable to find matching endpoint for target {} when storing a hint", target_id);
            }
        }

        let payload = self.inner.codec.serialize(mutation, CURRENT_MESSAGE_VERSION)?;
        self.inner
            .store
            .insert(target_id, CURRENT_MESSAGE_VERSION, payload, ttl_secs)?;
        Ok(())
    }

    /// The TTL a hint holding `mutation` would be stored with: the smallest
    /// grace period over the touched column families, capped by
    /// `max_hint_ttl_in_secs`. Exposed so the write path can decide whether
    /// hinting is still worthwhile.
    pub fn hint_ttl(
        &self,
        mutation: &Mutation,
    ) -> Result<u32> {
        Ok(hint_ttl(
            mutation,
            self.inner.registry.as_ref(),
            self.inner.config.handoff.max_hint_ttl_in_secs,
        )?)
    }

    /// Records a write the hint-window policy declined to store.
    pub fn record_hint_dropped(
        &self,
        endpoint: SocketAddr,
    ) {
        NOT_STORED_HINTS.with_label_values(&[&endpoint.to_string()]).inc();
    }

    /// Schedules one delivery session for `endpoint`. Duplicate submissions
    /// while a session is active or queued are no-ops.
    #[autometrics(objective = API_SLO)]
    pub fn schedule_delivery(
        &self,
        endpoint: SocketAddr,
    ) {
        // We should not deliver hints to the same host from two sessions
        if !self.inner.in_flight_targets.insert(endpoint) {
            return;
        }

        debug!("Scheduling delivery of hints to {}", endpoint);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let _guard = InFlightGuard {
                inner: Arc::clone(&inner),
                endpoint,
            };

            let Ok(_permit) = Arc::clone(&inner.delivery_slots).acquire_owned().await else {
                return; // pool shut down
            };

            let session = DeliverySession {
                config: inner.config.clone(),
                store: Arc::clone(&inner.store),
                registry: Arc::clone(&inner.registry),
                codec: inner.codec.clone(),
                membership: Arc::clone(&inner.membership),
                detector: Arc::clone(&inner.detector),
                gossip: Arc::clone(&inner.gossip),
                sender: Arc::clone(&inner.sender),
                paused: Arc::clone(&inner.paused),
            };

            match session.run(endpoint).await {
                Ok(outcome) => {
                    DELIVERY_SESSIONS.with_label_values(&[outcome.label()]).inc();
                }
                Err(e) => {
                    DELIVERY_SESSIONS.with_label_values(&["error"]).inc();
                    error!("Hint delivery to {} failed: {:?}", endpoint, e);
                }
            }
        });
    }

    /// One sweep pass: schedule delivery for every target currently holding
    /// hints. Targets whose token was since removed are dropped silently.
    pub fn schedule_all_deliveries(&self) -> Result<()> {
        for target_id in self.inner.store.distinct_targets()? {
            // token may have since been removed
            if let Some(endpoint) = self.inner.membership.endpoint_for(target_id) {
                self.schedule_delivery(endpoint);
            }
        }
        Ok(())
    }

    /// Pauses or resumes hint delivery globally. Running sessions observe
    /// the flag at their next page or row boundary.
    pub fn pause(
        &self,
        paused: bool,
    ) {
        info!("Hinted handoff delivery paused: {}", paused);
        self.inner.paused.store(paused, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::Acquire)
    }

    /// Drops every hint stored for `endpoint`, asynchronously: the caller
    /// may be processing gossip and must not block on storage.
    pub fn delete_hints_for(
        &self,
        endpoint: SocketAddr,
    ) {
        if !self.inner.membership.is_member(endpoint) {
            return;
        }
        let Some(host_id) = self.inner.membership.host_id(endpoint) else {
            return;
        };

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            log::info!("Deleting any stored hints for {}", endpoint);
            let result = inner.store.delete_all(host_id).and_then(|_| inner.store.compact());
            if let Err(e) = result {
                log::warn!("Could not delete hints for {}: {:?}", endpoint, e);
            }
        });
    }

    /// Empties the hint store; returns only after the truncate completes.
    pub async fn truncate_all(&self) -> Result<()> {
        info!("Truncating all stored hints.");
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.store.truncate())
            .await
            .map_err(|e| Error::Fatal(format!("truncate task failed: {e}")))?
    }

    /// The distinct target ids currently present in the store, for operator
    /// display.
    #[autometrics(objective = API_SLO)]
    pub fn list_pending_targets(&self) -> Result<Vec<TargetId>> {
        self.inner.store.distinct_targets()
    }
}
