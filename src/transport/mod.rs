//! Remote delivery seam. The engine hands a serialized mutation to this
//! trait and waits for the peer's acknowledgement; connection management and
//! in-flight retries belong to the implementation behind it.

use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;

use crate::SendError;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait HintSender: Send + Sync + 'static {
    /// Sends one serialized mutation to `endpoint` and resolves when the
    /// peer acknowledges the write. `SendError::Timeout` aborts the running
    /// delivery session after the current page drains; the next sweep
    /// resumes from where the session stopped.
    async fn send_mutation(
        &self,
        endpoint: SocketAddr,
        message_version: i32,
        payload: Bytes,
    ) -> Result<(), SendError>;
}
