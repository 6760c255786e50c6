//! # handoff-engine
//!
//! A durable, paged, rate-limited hinted-handoff engine for distributed
//! databases: write mutations intended for temporarily unreachable peers are
//! persisted locally as *hints* and replayed when those peers recover.
//!
//! ## Features
//! - **Durable storage**: hints survive restarts, keyed by the target peer's stable id
//! - **Paged delivery**: one session per target streams hints oldest-first with adaptive page sizing
//! - **Throttling**: a token-bucket byte budget scaled by cluster size
//! - **Lifecycle hygiene**: per-hint TTLs, truncation-aware filtering, post-delivery compaction
//! - **Operator control**: pause/resume, per-endpoint purge, global truncate, pending-target listing
//!
//! ## Quick Start
//! ```no_run
//! use std::sync::Arc;
//!
//! use handoff_engine::{HandoffManagerBuilder, HandoffNodeConfig};
//! use tokio::sync::watch;
//!
//! # fn collaborators() -> (Arc<dyn handoff_engine::TableRegistry>, Arc<dyn handoff_engine::Membership>, Arc<dyn handoff_engine::FailureDetector>, Arc<dyn handoff_engine::SchemaGossip>, Arc<dyn handoff_engine::HintSender>) { unimplemented!() }
//! #[tokio::main]
//! async fn main() -> handoff_engine::Result<()> {
//!     let (registry, membership, detector, gossip, sender) = collaborators();
//!     let config = HandoffNodeConfig::new()?;
//!
//!     let manager = HandoffManagerBuilder::new(config)
//!         .table_registry(registry)
//!         .membership(membership)
//!         .failure_detector(detector)
//!         .schema_gossip(gossip)
//!         .hint_sender(sender)
//!         .build()?;
//!
//!     let (_graceful_tx, graceful_rx) = watch::channel(());
//!     let _handles = manager.start(graceful_rx);
//!     Ok(())
//! }
//! ```
//!
//! ## Delivery model
//!
//! Delivery is at-least-once: a hint is deleted only after its remote write
//! is acknowledged, and the receiving peer's mutation handling is idempotent
//! by timestamp. There is no ordering guarantee between hints destined for
//! the same peer and no guarantee a hint is delivered before its TTL lapses.

// #![warn(missing_docs)]

pub mod cluster;
pub mod codec;
pub mod config;
pub mod store;
pub mod transport;

pub use cluster::*;
pub use codec::*;
pub use config::*;
pub use store::*;
pub use transport::*;

mod constants;
mod delivery;
mod errors;
mod manager;
mod metrics;
mod throttle;

pub use delivery::AbortReason;
pub use delivery::SessionOutcome;
pub use delivery::SkipReason;
pub use errors::*;
pub use manager::*;
pub use metrics::metrics_registry;
pub(crate) use metrics::*;
pub use throttle::DeliveryThrottle;

#[doc(hidden)]
pub mod utils;

//-----------------------------------------------------------
// Test utils
#[cfg(test)]
#[doc(hidden)]
pub mod test_utils;

//-----------------------------------------------------------
// Autometrics
use autometrics::objectives::Objective;
use autometrics::objectives::ObjectiveLatency;
use autometrics::objectives::ObjectivePercentile;

#[doc(hidden)]
const API_SLO: Objective = Objective::new("api")
    .success_rate(ObjectivePercentile::P99_9)
    .latency(ObjectiveLatency::Ms10, ObjectivePercentile::P99);
