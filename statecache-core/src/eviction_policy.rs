/// Represents the policy used for evicting entries from a cache when it reaches its limit.
///
/// # Variants
///
/// * `LRU` - **Least Recently Used** eviction policy (default)
///   - The entry accessed longest ago is removed first
///   - Ties (entries never read since insertion) fall back to insertion order
///   - Every `get` moves the key to the "most recent" end of the order queue
///
/// * `FIFO` - **First In, First Out** eviction policy
///   - The oldest inserted entry is removed first
///   - Reads do not change an entry's position
///
/// * `LFU` - **Least Frequently Used** eviction policy
///   - The entry with the lowest `access_count` is removed first
///   - Ties are broken by queue position (oldest first)
///
/// * `Random` - **Random** replacement
///   - A uniformly random entry is removed
///
/// # Examples
///
/// ```
/// use statecache_core::EvictionPolicy;
///
/// assert_eq!(EvictionPolicy::default(), EvictionPolicy::LRU);
///
/// let policy: EvictionPolicy = "lfu".into();
/// assert_eq!(policy, EvictionPolicy::LFU);
/// ```
///
/// # Performance Characteristics
///
/// | Policy | Eviction | Cache Hit |
/// |--------|----------|-----------|
/// | LRU    | O(1)     | O(n)      |
/// | FIFO   | O(1)     | O(1)      |
/// | LFU    | O(n)     | O(1)      |
/// | Random | O(n)     | O(1)      |
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    #[default]
    LRU,
    FIFO,
    LFU,
    Random,
}

impl EvictionPolicy {
    /// Whether a cache hit should move the key to the back of the order queue.
    pub fn reorders_on_hit(&self) -> bool {
        matches!(self, EvictionPolicy::LRU)
    }
}

/// Converts a string slice to an `EvictionPolicy`.
///
/// The conversion is case-insensitive and defaults to LRU for unrecognized values.
///
/// ```
/// use statecache_core::EvictionPolicy;
///
/// let fifo: EvictionPolicy = "FIFO".into();
/// assert_eq!(fifo, EvictionPolicy::FIFO);
///
/// let unknown: EvictionPolicy = "arc".into();
/// assert_eq!(unknown, EvictionPolicy::LRU);
/// ```
impl From<&str> for EvictionPolicy {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "fifo" => EvictionPolicy::FIFO,
            "lfu" => EvictionPolicy::LFU,
            "random" => EvictionPolicy::Random,
            _ => EvictionPolicy::LRU,
        }
    }
}
