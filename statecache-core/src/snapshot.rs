//! Export/import format for [`CacheManager`](crate::CacheManager).
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "timestamp": 1700000000000,
//!   "data": {
//!     "user:1": {
//!       "value": {"name": "Ada"},
//!       "metadata": {"createdAt": 1700000000000, "ttl": 300000, "...": "..."}
//!     }
//!   }
//! }
//! ```
//!
//! Every metadata field is optional when importing.

use crate::{EntryMetadata, Ttl};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub const SNAPSHOT_VERSION: &str = "1.0";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot<V> {
    pub version: String,
    /// Export time, epoch milliseconds.
    pub timestamp: u64,
    pub data: BTreeMap<String, SnapshotEntry<V>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry<V> {
    pub value: V,
    #[serde(default)]
    pub metadata: SnapshotMetadata,
}

/// Metadata as it appears in a snapshot.
///
/// `expires_at` and `ttl` distinguish "field missing" (`None`) from an
/// explicit `null` (`Some(None)`, never expires).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<Option<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_estimate: Option<usize>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub ttl: Option<Option<u64>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<&EntryMetadata> for SnapshotMetadata {
    fn from(meta: &EntryMetadata) -> Self {
        Self {
            created_at: Some(meta.created_at),
            expires_at: Some(meta.expires_at),
            last_accessed: Some(meta.last_accessed),
            access_count: Some(meta.access_count),
            size_estimate: Some(meta.size_estimate),
            ttl: Some(meta.ttl),
        }
    }
}

impl SnapshotMetadata {
    /// Fills in missing fields: timestamps default to `now`, counters to
    /// zero, the TTL to `default_ttl`. A missing `expiresAt` is derived from
    /// `createdAt + ttl`.
    pub fn resolve(&self, now: u64, default_ttl: Ttl, size_estimate: usize) -> EntryMetadata {
        let created_at = self.created_at.unwrap_or(now);
        let ttl = match self.ttl {
            Some(ttl) => ttl,
            None => default_ttl.as_millis(),
        };
        let expires_at = match self.expires_at {
            Some(expires_at) => expires_at,
            None => Ttl::from_millis(ttl).expires_at(created_at),
        };

        EntryMetadata {
            created_at,
            expires_at,
            last_accessed: self.last_accessed.unwrap_or(now),
            access_count: self.access_count.unwrap_or(0),
            size_estimate: self.size_estimate.unwrap_or(size_estimate),
            ttl,
        }
    }
}
