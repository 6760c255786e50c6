//! Stateful in-memory collaborators. Unlike mockall mocks these carry real
//! behavior, so a test can flip liveness or pause mid-session and observe
//! the pipeline react.

use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use dashmap::DashSet;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::FailureDetector;
use crate::HintSender;
use crate::Membership;
use crate::SchemaGossip;
use crate::SendError;
use crate::TableRegistry;
use crate::TargetId;

#[derive(Default)]
pub struct StaticTableRegistry {
    grace_periods: DashMap<Uuid, u32>,
    truncations: DashMap<Uuid, i64>,
}

impl StaticTableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(
        &self,
        cf_id: Uuid,
        grace_period_secs: u32,
    ) {
        self.grace_periods.insert(cf_id, grace_period_secs);
    }

    pub fn record_truncation(
        &self,
        cf_id: Uuid,
        truncated_at_ms: i64,
    ) {
        self.truncations.insert(cf_id, truncated_at_ms);
    }

    pub fn drop_table(
        &self,
        cf_id: Uuid,
    ) {
        self.grace_periods.remove(&cf_id);
    }
}

impl TableRegistry for StaticTableRegistry {
    fn grace_period_secs(
        &self,
        cf_id: Uuid,
    ) -> Option<u32> {
        self.grace_periods.get(&cf_id).map(|entry| *entry.value())
    }

    fn truncated_at_ms(
        &self,
        cf_id: Uuid,
    ) -> Option<i64> {
        self.truncations.get(&cf_id).map(|entry| *entry.value())
    }
}

#[derive(Default)]
pub struct StaticMembership {
    endpoints: DashMap<TargetId, SocketAddr>,
}

impl StaticMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(
        &self,
        target_id: TargetId,
        endpoint: SocketAddr,
    ) {
        self.endpoints.insert(target_id, endpoint);
    }

    pub fn leave(
        &self,
        target_id: TargetId,
    ) {
        self.endpoints.remove(&target_id);
    }
}

impl Membership for StaticMembership {
    fn endpoint_for(
        &self,
        target_id: TargetId,
    ) -> Option<SocketAddr> {
        self.endpoints.get(&target_id).map(|entry| *entry.value())
    }

    fn host_id(
        &self,
        endpoint: SocketAddr,
    ) -> Option<TargetId> {
        self.endpoints
            .iter()
            .find(|entry| *entry.value() == endpoint)
            .map(|entry| *entry.key())
    }

    fn all_endpoints(&self) -> Vec<SocketAddr> {
        self.endpoints.iter().map(|entry| *entry.value()).collect()
    }

    fn is_member(
        &self,
        endpoint: SocketAddr,
    ) -> bool {
        self.endpoints.iter().any(|entry| *entry.value() == endpoint)
    }
}

/// Everything is alive unless marked down. `mark_up` also publishes a
/// peer-restored event to every subscriber.
#[derive(Default)]
pub struct ManualFailureDetector {
    down: DashSet<SocketAddr>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<SocketAddr>>>,
}

impl ManualFailureDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_down(
        &self,
        endpoint: SocketAddr,
    ) {
        self.down.insert(endpoint);
    }

    pub fn mark_up(
        &self,
        endpoint: SocketAddr,
    ) {
        self.down.remove(&endpoint);
        let subscribers = self.subscribers.lock().expect("subscriber lock");
        for tx in subscribers.iter() {
            let _ = tx.send(endpoint);
        }
    }
}

impl FailureDetector for ManualFailureDetector {
    fn is_alive(
        &self,
        endpoint: SocketAddr,
    ) -> bool {
        !self.down.contains(&endpoint)
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<SocketAddr> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().expect("subscriber lock").push(tx);
        rx
    }
}

#[derive(Default)]
pub struct StaticSchemaGossip {
    local: Mutex<Option<Uuid>>,
    versions: DashMap<SocketAddr, Uuid>,
    known: DashSet<SocketAddr>,
}

impl StaticSchemaGossip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn agreeing(local: Uuid) -> Self {
        let gossip = Self::new();
        gossip.set_local(local);
        gossip
    }

    pub fn set_local(
        &self,
        version: Uuid,
    ) {
        *self.local.lock().expect("local schema lock") = Some(version);
    }

    /// Marks the endpoint as present in gossip and advertising `version`.
    pub fn publish(
        &self,
        endpoint: SocketAddr,
        version: Uuid,
    ) {
        self.known.insert(endpoint);
        self.versions.insert(endpoint, version);
    }

    /// Present in gossip but without a schema application state yet.
    pub fn mark_known(
        &self,
        endpoint: SocketAddr,
    ) {
        self.known.insert(endpoint);
    }

    pub fn forget(
        &self,
        endpoint: SocketAddr,
    ) {
        self.known.remove(&endpoint);
        self.versions.remove(&endpoint);
    }
}

impl SchemaGossip for StaticSchemaGossip {
    fn endpoint_known(
        &self,
        endpoint: SocketAddr,
    ) -> bool {
        self.known.contains(&endpoint)
    }

    fn schema_version(
        &self,
        endpoint: SocketAddr,
    ) -> Option<Uuid> {
        self.versions.get(&endpoint).map(|entry| *entry.value())
    }

    fn local_schema_version(&self) -> Option<Uuid> {
        *self.local.lock().expect("local schema lock")
    }
}

#[derive(Debug, Clone, Copy)]
pub enum SendScript {
    AckAll,
    TimeoutAll,
    /// Acknowledge the first `n` sends, then time out.
    AckFirst(u64),
}

/// Scripted transport recording every payload it was asked to deliver.
pub struct ScriptedSender {
    script: Mutex<SendScript>,
    sent: AtomicU64,
    acked: AtomicU64,
    captured: Mutex<Vec<Bytes>>,
}

impl ScriptedSender {
    pub fn new(script: SendScript) -> Self {
        Self {
            script: Mutex::new(script),
            sent: AtomicU64::new(0),
            acked: AtomicU64::new(0),
            captured: Mutex::new(Vec::new()),
        }
    }

    pub fn set_script(
        &self,
        script: SendScript,
    ) {
        *self.script.lock().expect("script lock") = script;
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Acquire)
    }

    pub fn acked(&self) -> u64 {
        self.acked.load(Ordering::Acquire)
    }

    pub fn captured_payloads(&self) -> Vec<Bytes> {
        self.captured.lock().expect("capture lock").clone()
    }
}

#[async_trait]
impl HintSender for ScriptedSender {
    async fn send_mutation(
        &self,
        endpoint: SocketAddr,
        _message_version: i32,
        payload: Bytes,
    ) -> Result<(), SendError> {
        let sequence = self.sent.fetch_add(1, Ordering::AcqRel);
        self.captured.lock().expect("capture lock").push(payload);
        let script = *self.script.lock().expect("script lock");

        let ack = match script {
            SendScript::AckAll => true,
            SendScript::TimeoutAll => false,
            SendScript::AckFirst(n) => sequence < n,
        };

        if ack {
            self.acked.fetch_add(1, Ordering::AcqRel);
            Ok(())
        } else {
            Err(SendError::Timeout {
                endpoint,
                after: std::time::Duration::from_secs(2),
            })
        }
    }
}
