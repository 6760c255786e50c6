//! Local schema knowledge consumed by the codec and the TTL / truncation
//! policy. The real registry lives in the schema subsystem; it is injected
//! here as a capability so tests can substitute deterministic fakes.

#[cfg(test)]
use mockall::automock;
use uuid::Uuid;

#[cfg_attr(test, automock)]
pub trait TableRegistry: Send + Sync + 'static {
    /// Tombstone retention period of the column family, in seconds.
    /// `None` means this node does not know the family (dropped table).
    fn grace_period_secs(
        &self,
        cf_id: Uuid,
    ) -> Option<u32>;

    /// Wall-clock instant the column family was last truncated, in epoch
    /// milliseconds. Writes earlier than this are no longer meaningful.
    fn truncated_at_ms(
        &self,
        cf_id: Uuid,
    ) -> Option<i64>;
}
