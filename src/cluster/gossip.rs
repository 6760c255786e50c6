use std::net::SocketAddr;

#[cfg(test)]
use mockall::automock;
use uuid::Uuid;

/// The slice of gossip state the engine needs: which schema version each
/// peer is currently advertising.
#[cfg_attr(test, automock)]
pub trait SchemaGossip: Send + Sync + 'static {
    /// Whether gossip has any state at all for the endpoint. A peer that
    /// vanishes mid-wait fails the schema-agreement check.
    fn endpoint_known(
        &self,
        endpoint: SocketAddr,
    ) -> bool;

    /// The schema UUID the peer is advertising, or `None` if it has not
    /// published one yet.
    fn schema_version(
        &self,
        endpoint: SocketAddr,
    ) -> Option<Uuid>;

    /// The schema UUID this node is advertising.
    fn local_schema_version(&self) -> Option<Uuid>;
}
