use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Time-to-live for a cache entry.
///
/// `Never` is the "infinite" TTL: the entry only leaves the cache through
/// deletion or eviction.
///
/// # Examples
///
/// ```
/// use statecache_core::Ttl;
/// use std::time::Duration;
///
/// let ttl: Ttl = Duration::from_secs(60).into();
/// assert_eq!(ttl.as_millis(), Some(60_000));
/// assert_eq!(Ttl::Never.as_millis(), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ttl {
    Never,
    After(Duration),
}

impl Ttl {
    pub fn as_millis(&self) -> Option<u64> {
        match self {
            Ttl::Never => None,
            Ttl::After(d) => Some(d.as_millis() as u64),
        }
    }

    pub fn from_millis(millis: Option<u64>) -> Self {
        match millis {
            Some(ms) => Ttl::After(Duration::from_millis(ms)),
            None => Ttl::Never,
        }
    }

    /// Absolute expiry for an entry written at `now`.
    pub fn expires_at(&self, now: u64) -> Option<u64> {
        self.as_millis().map(|ms| now.saturating_add(ms))
    }
}

impl From<Duration> for Ttl {
    fn from(d: Duration) -> Self {
        Ttl::After(d)
    }
}

/// Bookkeeping kept next to every cached value.
///
/// All timestamps are epoch milliseconds. Serialized with camelCase field
/// names, which is also the shape used by cache exports.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMetadata {
    pub created_at: u64,
    /// `None` means the entry never expires.
    pub expires_at: Option<u64>,
    pub last_accessed: u64,
    pub access_count: u64,
    /// Length of the value's JSON encoding, in bytes.
    pub size_estimate: usize,
    /// TTL the entry was written with, in milliseconds.
    pub ttl: Option<u64>,
}

impl EntryMetadata {
    pub fn new(now: u64, ttl: Ttl, size_estimate: usize) -> Self {
        Self {
            created_at: now,
            expires_at: ttl.expires_at(now),
            last_accessed: now,
            access_count: 0,
            size_estimate,
            ttl: ttl.as_millis(),
        }
    }

    /// An entry is expired once `now` reaches `expires_at`.
    pub fn is_expired(&self, now: u64) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => false,
        }
    }

    /// Records one access.
    pub fn touch(&mut self, now: u64) {
        self.last_accessed = now;
        self.access_count = self.access_count.saturating_add(1);
    }
}

/// A cached value together with its [`EntryMetadata`].
///
/// # Examples
///
/// ```
/// use statecache_core::{CacheEntry, Ttl};
/// use std::time::Duration;
///
/// let entry = CacheEntry::new("data".to_string(), 1_000, Ttl::After(Duration::from_millis(100)));
/// assert!(!entry.is_expired(1_050));
/// assert!(entry.is_expired(1_100));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    pub value: V,
    pub metadata: EntryMetadata,
}

impl<V: Serialize> CacheEntry<V> {
    /// Creates an entry written at `now`, sizing it from its JSON encoding.
    pub fn new(value: V, now: u64, ttl: Ttl) -> Self {
        let size = estimate_size(&value);
        Self {
            value,
            metadata: EntryMetadata::new(now, ttl, size),
        }
    }
}

impl<V> CacheEntry<V> {
    pub fn is_expired(&self, now: u64) -> bool {
        self.metadata.is_expired(now)
    }
}

/// Estimates the footprint of a value as the byte length of its JSON form.
///
/// Values that fail to serialize fall back to their stack size.
pub fn estimate_size<V: Serialize>(value: &V) -> usize {
    serde_json::to_vec(value)
        .map(|bytes| bytes.len())
        .unwrap_or_else(|_| std::mem::size_of_val(value))
}
