//! Hinted Handoff Error Hierarchy
//!
//! Defines error types for the handoff engine, categorized by subsystem.
//! The delivery session is the error boundary: most conditions inside it
//! convert to "abort this attempt" and the next scheduled sweep retries.

use std::net::SocketAddr;
use std::time::Duration;

use config::ConfigError;
use uuid::Uuid;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Hint store failures (validation or execution)
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Mutation encode/decode and TTL policy failures
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Remote delivery failures
    #[error(transparent)]
    Send(#[from] SendError),

    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration validation failures
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Unrecoverable failures: data on disk is corrupt
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Malformed arguments handed to the store; a programmer error
    #[error("Storage validation failed: {0}")]
    Validation(String),

    /// Underlying engine failure; the session aborts and the sweep retries
    #[error("Storage engine error: {0}")]
    Engine(#[from] sled::Error),

    /// A persisted key or value that no longer parses
    #[error("Undecodable hint record: {0}")]
    RecordDecode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The mutation references a column family this node no longer knows;
    /// the hint is deleted and delivery continues
    #[error("Unknown column family {0}")]
    UnknownColumnFamily(Uuid),

    /// Serialized with a wire version newer than this node speaks
    #[error("Unsupported message version {0}")]
    UnsupportedVersion(i32),

    /// The mutation bytes do not parse at the recorded version
    #[error("Corrupt mutation payload: {0}")]
    Corrupt(#[from] prost::DecodeError),

    /// A column family id that is not a 16-byte UUID
    #[error("Malformed column family id in mutation")]
    MalformedFamilyId,

    /// Computed hint TTL was not positive; the insert is rejected
    #[error("Hint TTL for keyspace {keyspace} is not positive")]
    NonPositiveTtl { keyspace: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The remote write was dispatched but no acknowledgement arrived in time
    #[error("Write to {endpoint} timed out after {after:?}")]
    Timeout { endpoint: SocketAddr, after: Duration },

    /// Connection-level failure before an acknowledgement could be produced
    #[error("Peer {endpoint} unreachable: {detail}")]
    Unreachable { endpoint: SocketAddr, detail: String },
}

impl SendError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SendError::Timeout { .. })
    }
}
