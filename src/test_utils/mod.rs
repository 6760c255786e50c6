//! Deterministic fakes and builders shared between unit tests. Integration
//! tests carry their own copies under `tests/`.

mod fakes;

pub use fakes::*;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use crate::init_sled_hints_db;
use crate::Cell;
use crate::ColumnFamilyUpdate;
use crate::HandoffManagerBuilder;
use crate::HandoffNodeConfig;
use crate::HintStore;
use crate::HintedHandoffManager;
use crate::Mutation;
use crate::SledHintStore;
use crate::TargetId;

pub fn test_endpoint(octet: u8) -> SocketAddr {
    format!("10.0.0.{octet}:7000").parse().expect("valid addr")
}

/// A mutation touching the given column families, one cell each.
pub fn sample_mutation(
    keyspace: &str,
    cf_ids: &[Uuid],
    value_len: usize,
) -> Mutation {
    Mutation {
        keyspace: keyspace.to_string(),
        partition_key: b"pk".to_vec(),
        updates: cf_ids
            .iter()
            .map(|cf_id| ColumnFamilyUpdate {
                cf_id: cf_id.as_bytes().to_vec(),
                cells: vec![Cell {
                    name: b"col".to_vec(),
                    value: vec![0xCD; value_len],
                    timestamp_micros: 1_000,
                }],
            })
            .collect(),
    }
}

/// Config tuned for fast tests: tiny ring delay, frequent sweeps, no
/// throttling unless the test opts in.
pub fn test_config(db_root_dir: &Path) -> HandoffNodeConfig {
    let mut config = HandoffNodeConfig::default();
    config.cluster.db_root_dir = db_root_dir.to_path_buf();
    config.cluster.ring_delay_in_ms = 100;
    config.handoff.throttle_in_kb = 0;
    config.handoff.sweep_interval_in_secs = 1;
    config
}

/// A fully wired manager over fakes and a real sled store, with one known
/// column family and one member peer.
pub struct TestCluster {
    pub _dir: tempfile::TempDir,
    pub manager: HintedHandoffManager,
    pub store: Arc<SledHintStore>,
    pub registry: Arc<StaticTableRegistry>,
    pub membership: Arc<StaticMembership>,
    pub detector: Arc<ManualFailureDetector>,
    pub gossip: Arc<StaticSchemaGossip>,
    pub sender: Arc<ScriptedSender>,
    pub target: TargetId,
    pub endpoint: SocketAddr,
    pub cf: Uuid,
}

pub fn test_cluster() -> TestCluster {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = init_sled_hints_db(dir.path()).expect("open db");
    let store = Arc::new(SledHintStore::new(&db).expect("open store"));

    let registry = Arc::new(StaticTableRegistry::new());
    let cf = Uuid::new_v4();
    registry.add_table(cf, 864_000);

    let membership = Arc::new(StaticMembership::new());
    let target = Uuid::new_v4();
    let endpoint = test_endpoint(1);
    membership.join(target, endpoint);

    let detector = Arc::new(ManualFailureDetector::new());

    let schema = Uuid::new_v4();
    let gossip = Arc::new(StaticSchemaGossip::agreeing(schema));
    gossip.publish(endpoint, schema);

    let sender = Arc::new(ScriptedSender::new(SendScript::AckAll));

    let manager = HandoffManagerBuilder::new(test_config(dir.path()))
        .store(store.clone())
        .table_registry(registry.clone())
        .membership(membership.clone())
        .failure_detector(detector.clone())
        .schema_gossip(gossip.clone())
        .hint_sender(sender.clone())
        .build()
        .expect("build manager");

    TestCluster {
        _dir: dir,
        manager,
        store,
        registry,
        membership,
        detector,
        gossip,
        sender,
        target,
        endpoint,
        cf,
    }
}

impl TestCluster {
    pub fn insert_hints(
        &self,
        count: usize,
    ) {
        let mutation = sample_mutation("ks1", &[self.cf], 32);
        for _ in 0..count {
            self.manager.store_hint(self.target, &mutation).expect("store hint");
        }
    }

    pub fn pending(&self) -> usize {
        self.store.scan_page(self.target, 4096, None).expect("scan").rows.len()
    }
}
