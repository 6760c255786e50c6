use std::net::SocketAddr;

#[cfg(test)]
use mockall::automock;

use crate::TargetId;

/// Authoritative view of cluster membership: the mapping between stable peer
/// identities and their current endpoints.
#[cfg_attr(test, automock)]
pub trait Membership: Send + Sync + 'static {
    /// Resolves a stable peer id to its current endpoint, if the peer is
    /// still a member. A hint target whose token was removed resolves to
    /// `None` and is dropped by the sweep.
    fn endpoint_for(
        &self,
        target_id: TargetId,
    ) -> Option<SocketAddr>;

    /// Reverse lookup: the stable id behind an endpoint.
    fn host_id(
        &self,
        endpoint: SocketAddr,
    ) -> Option<TargetId>;

    /// Every endpoint currently in the ring, including this node.
    fn all_endpoints(&self) -> Vec<SocketAddr>;

    fn is_member(
        &self,
        endpoint: SocketAddr,
    ) -> bool;
}
