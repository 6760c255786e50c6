//! Mutation wire model, versioned codec, and hint policy.

mod mutation;
mod policy;
mod registry;

pub use mutation::*;
pub use policy::hint_ttl;
pub(crate) use policy::{strip_truncated, TruncationCache};
pub use registry::*;

#[cfg(test)]
mod policy_test;

use std::sync::Arc;

use bytes::Bytes;
use prost::Message;

use crate::CodecError;

/// The wire-format version this node serializes mutations with. Hints keep
/// the version they were written at so a peer may retain hints across
/// protocol upgrades.
pub const CURRENT_MESSAGE_VERSION: i32 = 10;

/// Versioned mutation serializer backed by the local table registry.
#[derive(Clone)]
pub struct MutationCodec {
    registry: Arc<dyn TableRegistry>,
}

impl MutationCodec {
    pub fn new(registry: Arc<dyn TableRegistry>) -> Self {
        Self { registry }
    }

    pub fn serialize(
        &self,
        mutation: &Mutation,
        version: i32,
    ) -> Result<Bytes, CodecError> {
        if version > CURRENT_MESSAGE_VERSION || version <= 0 {
            return Err(CodecError::UnsupportedVersion(version));
        }

        Ok(Bytes::from(mutation.encode_to_vec()))
    }

    /// Decodes a stored hint payload at the version it was written with.
    ///
    /// `UnknownColumnFamily` means the schema evolved out from under the
    /// hint (table dropped); the caller deletes the hint and continues. Any
    /// other failure means the bytes on disk are corrupt.
    pub fn deserialize(
        &self,
        bytes: &[u8],
        version: i32,
    ) -> Result<Mutation, CodecError> {
        if version > CURRENT_MESSAGE_VERSION || version <= 0 {
            return Err(CodecError::UnsupportedVersion(version));
        }

        let mutation = Mutation::decode(bytes)?;
        for update in &mutation.updates {
            let cf_id = update.cf_uuid().ok_or(CodecError::MalformedFamilyId)?;
            if self.registry.grace_period_secs(cf_id).is_none() {
                return Err(CodecError::UnknownColumnFamily(cf_id));
            }
        }
        Ok(mutation)
    }
}
