use std::net::SocketAddr;

#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;

/// Peer liveness as reported by the cluster's failure detector.
#[cfg_attr(test, automock)]
pub trait FailureDetector: Send + Sync + 'static {
    fn is_alive(
        &self,
        endpoint: SocketAddr,
    ) -> bool;

    /// Stream of endpoints that just transitioned to alive. The scheduler
    /// consumes this to trigger event-driven delivery.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<SocketAddr>;
}
