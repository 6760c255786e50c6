//! Builder for [`HintedHandoffManager`].
//!
//! The engine owns no process globals. Every collaborator (membership,
//! failure detector, schema gossip, table registry, transport) is injected
//! here, and tests substitute deterministic fakes through the same setters.
//! Only the hint store has a production default: sled under
//! `cluster.db_root_dir`.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use dashmap::DashSet;
use tokio::sync::Semaphore;
use tracing::debug;

use super::HandoffInner;
use super::HintedHandoffManager;
use crate::init_sled_hints_db;
use crate::Error;
use crate::FailureDetector;
use crate::HandoffNodeConfig;
use crate::HintSender;
use crate::HintStore;
use crate::Membership;
use crate::MutationCodec;
use crate::Result;
use crate::SchemaGossip;
use crate::SledHintStore;
use crate::StorageError;
use crate::TableRegistry;

pub struct HandoffManagerBuilder {
    config: HandoffNodeConfig,
    store: Option<Arc<dyn HintStore>>,
    registry: Option<Arc<dyn TableRegistry>>,
    membership: Option<Arc<dyn Membership>>,
    detector: Option<Arc<dyn FailureDetector>>,
    gossip: Option<Arc<dyn SchemaGossip>>,
    sender: Option<Arc<dyn HintSender>>,
}

impl HandoffManagerBuilder {
    pub fn new(config: HandoffNodeConfig) -> Self {
        Self {
            config,
            store: None,
            registry: None,
            membership: None,
            detector: None,
            gossip: None,
            sender: None,
        }
    }

    /// Overrides the default sled-backed hint store.
    pub fn store(
        mut self,
        store: Arc<dyn HintStore>,
    ) -> Self {
        self.store = Some(store);
        self
    }

    pub fn table_registry(
        mut self,
        registry: Arc<dyn TableRegistry>,
    ) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn membership(
        mut self,
        membership: Arc<dyn Membership>,
    ) -> Self {
        self.membership = Some(membership);
        self
    }

    pub fn failure_detector(
        mut self,
        detector: Arc<dyn FailureDetector>,
    ) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn schema_gossip(
        mut self,
        gossip: Arc<dyn SchemaGossip>,
    ) -> Self {
        self.gossip = Some(gossip);
        self
    }

    pub fn hint_sender(
        mut self,
        sender: Arc<dyn HintSender>,
    ) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn build(self) -> Result<HintedHandoffManager> {
        self.config.validate()?;

        let store: Arc<dyn HintStore> = match self.store {
            Some(store) => store,
            None => {
                debug!("Opening default sled hint store under {:?}", self.config.cluster.db_root_dir);
                let db = init_sled_hints_db(&self.config.cluster.db_root_dir).map_err(StorageError::Io)?;
                Arc::new(SledHintStore::new(&db)?)
            }
        };

        let registry = self
            .registry
            .ok_or_else(|| Error::InvalidConfig("table registry is required".into()))?;
        let membership = self
            .membership
            .ok_or_else(|| Error::InvalidConfig("membership is required".into()))?;
        let detector = self
            .detector
            .ok_or_else(|| Error::InvalidConfig("failure detector is required".into()))?;
        let gossip = self
            .gossip
            .ok_or_else(|| Error::InvalidConfig("schema gossip is required".into()))?;
        let sender = self
            .sender
            .ok_or_else(|| Error::InvalidConfig("hint sender is required".into()))?;

        let delivery_slots = Arc::new(Semaphore::new(self.config.handoff.max_hint_threads));
        let codec = MutationCodec::new(Arc::clone(&registry));

        Ok(HintedHandoffManager::from_inner(HandoffInner {
            config: self.config,
            store,
            registry,
            codec,
            membership,
            detector,
            gossip,
            sender,
            paused: Arc::new(AtomicBool::new(false)),
            in_flight_targets: DashSet::new(),
            delivery_slots,
        }))
    }
}
