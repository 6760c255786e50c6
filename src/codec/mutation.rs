//! Wire model of a write mutation: a batch of column-family updates addressed
//! to one partition key. These are plain prost messages so the payload stored
//! in a hint record is byte-stable across releases.

use prost::Message;
use uuid::Uuid;

/// A write addressed to one partition of one keyspace.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Mutation {
    #[prost(string, tag = "1")]
    pub keyspace: ::prost::alloc::string::String,

    #[prost(bytes = "vec", tag = "2")]
    pub partition_key: ::prost::alloc::vec::Vec<u8>,

    #[prost(message, repeated, tag = "3")]
    pub updates: ::prost::alloc::vec::Vec<ColumnFamilyUpdate>,
}

/// The slice of a mutation touching a single column family.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ColumnFamilyUpdate {
    /// 16-byte column family UUID
    #[prost(bytes = "vec", tag = "1")]
    pub cf_id: ::prost::alloc::vec::Vec<u8>,

    #[prost(message, repeated, tag = "2")]
    pub cells: ::prost::alloc::vec::Vec<Cell>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Cell {
    #[prost(bytes = "vec", tag = "1")]
    pub name: ::prost::alloc::vec::Vec<u8>,

    #[prost(bytes = "vec", tag = "2")]
    pub value: ::prost::alloc::vec::Vec<u8>,

    /// Conflict-resolution timestamp in microseconds; the receiving peer's
    /// mutation handling is idempotent by this value
    #[prost(int64, tag = "3")]
    pub timestamp_micros: i64,
}

impl Mutation {
    /// Distinct column family ids touched by this mutation. Ids that do not
    /// parse as UUIDs are skipped here; the codec rejects them on decode.
    pub fn column_family_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.updates.iter().filter_map(ColumnFamilyUpdate::cf_uuid).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Returns this mutation with every update for `cf_id` removed.
    pub fn without(
        mut self,
        cf_id: Uuid,
    ) -> Self {
        self.updates.retain(|u| u.cf_uuid() != Some(cf_id));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Serialized wire size; sized against the rate limiter before dispatch.
    pub fn serialized_size(&self) -> usize {
        self.encoded_len()
    }
}

impl ColumnFamilyUpdate {
    pub fn cf_uuid(&self) -> Option<Uuid> {
        Uuid::from_slice(&self.cf_id).ok()
    }
}
