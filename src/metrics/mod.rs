
use lazy_static::lazy_static;
use prometheus::core::Collector;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use tracing::info;

lazy_static! {
    /// Hints persisted for a peer that was unreachable at write time
    pub static ref CREATED_HINTS: IntCounterVec =
        IntCounterVec::new(Opts::new("created_hints", "hints stored per target endpoint"), &["endpoint"])
            .expect("metric can not be created");

    /// Writes the hint window policy declined to store
    pub static ref NOT_STORED_HINTS: IntCounterVec =
        IntCounterVec::new(Opts::new("not_stored_hints", "hints dropped per target endpoint"), &["endpoint"])
            .expect("metric can not be created");

    /// Hints acknowledged by their target and deleted
    pub static ref REPLAYED_HINTS: IntCounter =
        IntCounter::new("replayed_hints", "hints delivered, acknowledged and deleted")
            .expect("metric can not be created");

    /// Delivery sessions by terminal outcome
    pub static ref DELIVERY_SESSIONS: IntCounterVec =
        IntCounterVec::new(Opts::new("delivery_sessions", "delivery sessions by outcome"), &["outcome"])
            .expect("metric can not be created");

    pub static ref CUSTOM_REGISTRY: Registry =
        Registry::new_custom(Some("handoff_engine".to_string()), None).unwrap();
}

static REGISTER_ONCE: std::sync::Once = std::sync::Once::new();

/// The registry a host process should scrape. Collectors are registered on
/// first access.
pub fn metrics_registry() -> &'static Registry {
    REGISTER_ONCE.call_once(|| register_custom_metrics(&CUSTOM_REGISTRY));
    &CUSTOM_REGISTRY
}

pub(crate) fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(CREATED_HINTS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(NOT_STORED_HINTS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(REPLAYED_HINTS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(DELIVERY_SESSIONS.clone()))
        .expect("collector can be registered");
}

/// Periodic one-line summary; the sweep loop invokes this after each pass.
pub(crate) fn log_counters() {
    info!(
        "Hinted handoff counters: created={} replayed={}",
        sum_counter_vec(&CREATED_HINTS),
        REPLAYED_HINTS.get(),
    );
}

fn sum_counter_vec(vec: &IntCounterVec) -> u64 {
    vec.collect()
        .iter()
        .flat_map(|mf| mf.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}
