use crate::cache_entry::estimate_size;
use crate::snapshot::{CacheSnapshot, SnapshotEntry, SNAPSHOT_VERSION};
use crate::utils::{move_key_to_end, remove_key, select_eviction_key};
use crate::{
    CacheEntry, CacheError, CacheStats, Clock, EntryMetadata, EvictionPolicy, Storage,
    SystemClock, Ttl,
};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Prefix for keys mirrored into a persistent [`Storage`].
pub const CACHE_KEY_PREFIX: &str = "cache_";

/// Where a [`CacheManager`] keeps its entries.
#[derive(Clone, Default)]
pub enum StorageMode {
    /// Process memory only.
    #[default]
    Memory,
    /// Process memory, mirrored to a backend under `cache_<key>`.
    Persistent(Arc<dyn Storage>),
}

impl fmt::Debug for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::Memory => f.write_str("Memory"),
            StorageMode::Persistent(_) => f.write_str("Persistent(..)"),
        }
    }
}

/// Construction options for [`CacheManager`].
///
/// # Examples
///
/// ```
/// use statecache_core::{CacheConfig, EvictionPolicy, Ttl};
/// use std::time::Duration;
///
/// let config = CacheConfig::default()
///     .max_size(500)
///     .ttl(Duration::from_secs(60))
///     .policy(EvictionPolicy::LFU);
///
/// assert_eq!(config.max_size, Some(500));
/// assert_eq!(config.ttl, Ttl::After(Duration::from_secs(60)));
/// ```
#[derive(Clone)]
pub struct CacheConfig {
    /// Maximum number of live entries. `None` means unbounded.
    pub max_size: Option<usize>,
    /// Default TTL for entries written without an explicit one.
    pub ttl: Ttl,
    pub policy: EvictionPolicy,
    /// Upper bound on the summed `size_estimate` of all entries, in bytes.
    pub max_memory: Option<usize>,
    pub storage: StorageMode,
    pub clock: Arc<dyn Clock>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: Some(1000),
            ttl: Ttl::After(Duration::from_secs(5 * 60)),
            policy: EvictionPolicy::default(),
            max_memory: None,
            storage: StorageMode::Memory,
            clock: Arc::new(SystemClock),
        }
    }
}

impl CacheConfig {
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Removes the entry-count limit.
    pub fn unbounded(mut self) -> Self {
        self.max_size = None;
        self
    }

    pub fn ttl(mut self, ttl: impl Into<Ttl>) -> Self {
        self.ttl = ttl.into();
        self
    }

    pub fn policy(mut self, policy: impl Into<EvictionPolicy>) -> Self {
        self.policy = policy.into();
        self
    }

    pub fn max_memory(mut self, bytes: usize) -> Self {
        self.max_memory = Some(bytes);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = StorageMode::Persistent(storage);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("max_size", &self.max_size)
            .field("ttl", &self.ttl)
            .field("policy", &self.policy)
            .field("max_memory", &self.max_memory)
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

enum Lookup<V> {
    Hit(V),
    Expired,
    Absent,
}

/// Keys removed while making room for an insert.
#[derive(Default)]
struct Removed {
    expired: Vec<String>,
    evicted: Vec<String>,
    dropped: Option<String>,
}

/// A TTL- and size-bounded key/value cache with LRU eviction.
///
/// `CacheManager` is an explicit instance: construct one per use and share
/// it by `Arc`. All methods take `&self`.
///
/// # Type Parameters
///
/// * `V` - The cached payload. `Clone` is the deep copy made on every write
///   and read, so callers never alias cached state. Payloads must be JSON
///   serializable for exports, size estimates and persistent mirroring.
///
/// # Features
///
/// - **TTL**: per-manager default, per-entry override, lazy expiry on lookup
/// - **Limits**: entry count (`max_size`) and estimated bytes (`max_memory`)
/// - **Eviction policies**: LRU (default), FIFO, LFU, Random
/// - **Statistics**: hits, misses, hit rate, evictions, expirations
/// - **Batch ops**: `mset`, `mget`, `mdel`
/// - **Loaders**: `get_or_load` and `warmup` with async loader functions
/// - **Snapshots**: `export`/`import`, preserving metadata
/// - **Persistence**: optional mirroring to a [`Storage`] backend
///
/// # Thread Safety
///
/// Entries live in a `parking_lot::RwLock<HashMap>`, the eviction order in a
/// `parking_lot::Mutex<VecDeque>`. Every operation that changes an entry or
/// its persisted mirror also holds a `parking_lot::ReentrantMutex` from the
/// first read to the last storage write, so read-modify-write calls
/// (`update`, `set_if_absent`) are atomic and the mirror never disagrees
/// with memory. Lock order is writer, then order, then map.
///
/// The `update` closure runs with the writer lock held; it may call back
/// into the same manager on the same thread, but must not wait on another
/// thread that does. No lock is held while a `get_or_load` loader runs.
///
/// # Examples
///
/// ```
/// use statecache_core::{CacheConfig, CacheManager};
/// use serde_json::json;
///
/// let cache = CacheManager::new(CacheConfig::default().max_size(3));
/// cache.set("a", json!(1));
/// cache.set("b", json!(2));
/// cache.set("c", json!(3));
///
/// let _ = cache.get("a");
/// cache.set("d", json!(4));
///
/// assert!(cache.has("a"));
/// assert!(!cache.has("b"));
/// assert!(cache.has("c"));
/// assert!(cache.has("d"));
/// ```
pub struct CacheManager<V = Value> {
    writer: ReentrantMutex<()>,
    map: RwLock<HashMap<String, CacheEntry<V>>>,
    order: Mutex<VecDeque<String>>,
    config: CacheConfig,
    stats: CacheStats,
}

impl<V> CacheManager<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            writer: ReentrantMutex::new(()),
            map: RwLock::new(HashMap::new()),
            order: Mutex::new(VecDeque::new()),
            config,
            stats: CacheStats::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn now(&self) -> u64 {
        self.config.clock.now_millis()
    }

    /// Stores a copy of `value` under `key` with the default TTL.
    pub fn set(&self, key: &str, value: V) {
        self.set_with_ttl(key, value, self.config.ttl);
    }

    /// Stores a copy of `value` with a TTL that overrides the default for
    /// this entry only.
    pub fn set_with_ttl(&self, key: &str, value: V, ttl: impl Into<Ttl>) {
        let entry = CacheEntry::new(value, self.now(), ttl.into());
        self.insert_entry(key, entry, true);
    }

    /// Retrieves a copy of the cached value.
    ///
    /// # Returns
    ///
    /// * `Some(V)` - The value, if present and not expired
    /// * `None` - If the key is absent or the entry has expired; an expired
    ///   entry is removed as a side effect
    ///
    /// A hit bumps `last_accessed` and `access_count` and, under LRU, moves
    /// the key to the most-recently-used end. Every call counts as either a
    /// hit or a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let _write = self.writer.lock();
        let now = self.now();
        match self.lookup(key, now) {
            Lookup::Hit(value) => {
                self.stats.record_hit();
                Some(value)
            }
            Lookup::Expired => {
                self.stats.record_expiration();
                self.stats.record_miss();
                self.unmirror(key);
                None
            }
            Lookup::Absent => match self.rehydrate(key, now, true) {
                Some(entry) => {
                    self.stats.record_hit();
                    Some(entry.value)
                }
                None => {
                    self.stats.record_miss();
                    None
                }
            },
        }
    }

    fn lookup(&self, key: &str, now: u64) -> Lookup<V> {
        let mut order = self.order.lock();
        let mut map = self.map.write();

        let expired = match map.get(key) {
            Some(entry) => entry.is_expired(now),
            None => return Lookup::Absent,
        };

        if expired {
            remove_key(&mut map, &mut order, key);
            debug!(key, "purged expired cache entry");
            return Lookup::Expired;
        }

        let value = match map.get_mut(key) {
            Some(entry) => {
                entry.metadata.touch(now);
                entry.value.clone()
            }
            None => return Lookup::Absent,
        };
        if self.config.policy.reorders_on_hit() {
            move_key_to_end(&mut order, key);
        }
        Lookup::Hit(value)
    }

    /// Live value without touching statistics or recency.
    fn peek(&self, key: &str) -> Option<CacheEntry<V>> {
        let now = self.now();
        let map = self.map.read();
        map.get(key).filter(|e| !e.is_expired(now)).cloned()
    }

    /// Existence check that leaves access statistics alone.
    ///
    /// In persistent mode a key found only in storage is loaded back into
    /// memory (without counting as an access), so `size` and `keys` agree
    /// with `has` afterwards.
    pub fn has(&self, key: &str) -> bool {
        let _write = self.storage().map(|_| self.writer.lock());
        let now = self.now();
        {
            let map = self.map.read();
            if let Some(entry) = map.get(key) {
                return !entry.is_expired(now);
            }
        }
        self.rehydrate(key, now, false).is_some()
    }

    /// Removes an entry. Returns `true` if the key was present.
    pub fn delete(&self, key: &str) -> bool {
        let _write = self.writer.lock();
        let removed = {
            let mut order = self.order.lock();
            let mut map = self.map.write();
            remove_key(&mut map, &mut order, key).is_some()
        };
        self.unmirror(key);
        removed
    }

    /// Removes every entry and resets the statistics.
    pub fn clear(&self) {
        let _write = self.writer.lock();
        {
            let mut order = self.order.lock();
            let mut map = self.map.write();
            map.clear();
            order.clear();
        }
        self.stats.reset();

        if let StorageMode::Persistent(storage) = &self.config.storage {
            match storage.keys() {
                Ok(keys) => {
                    for key in keys.iter().filter(|k| k.starts_with(CACHE_KEY_PREFIX)) {
                        if let Err(err) = storage.remove_item(key) {
                            warn!(key = %key, error = %err, "failed to remove mirrored cache entry");
                        }
                    }
                }
                Err(err) => warn!(error = %err, "failed to list storage keys while clearing cache"),
            }
        }
    }

    /// Number of live (non-expired) entries held in memory.
    ///
    /// Entries persisted by an earlier manager are counted only once a
    /// `get`, `has`, `update` or `set_if_absent` has loaded them back.
    pub fn size(&self) -> usize {
        let now = self.now();
        self.map
            .read()
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Live keys held in memory, from next-to-evict to most recently used.
    /// Like [`size`](Self::size), persisted entries appear once loaded.
    pub fn keys(&self) -> Vec<String> {
        let now = self.now();
        let order = self.order.lock();
        let map = self.map.read();
        order
            .iter()
            .filter(|k| map.get(*k).map(|e| !e.is_expired(now)).unwrap_or(false))
            .cloned()
            .collect()
    }

    /// Sets every pair in order, exactly like repeated [`set`](Self::set).
    pub fn mset<I, K>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
    {
        for (key, value) in entries {
            self.set(key.as_ref(), value);
        }
    }

    /// Looks up every key in order, exactly like repeated [`get`](Self::get).
    pub fn mget<I, K>(&self, keys: I) -> HashMap<String, Option<V>>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        keys.into_iter()
            .map(|key| {
                let key = key.as_ref();
                (key.to_string(), self.get(key))
            })
            .collect()
    }

    /// Deletes every key; returns how many were present.
    pub fn mdel<I, K>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        keys.into_iter().filter(|k| self.delete(k.as_ref())).count()
    }

    /// Stores `value` only if `key` is not live.
    ///
    /// # Returns
    ///
    /// * `None` - The value was stored
    /// * `Some(existing)` - The key was already live; nothing changed
    pub fn set_if_absent(&self, key: &str, value: V) -> Option<V> {
        let _write = self.writer.lock();
        if let Some(existing) = self.live_entry(key) {
            return Some(existing.value);
        }
        self.set(key, value);
        None
    }

    /// Live entry from memory, or from the persistent mirror without
    /// counting as an access.
    fn live_entry(&self, key: &str) -> Option<CacheEntry<V>> {
        self.peek(key)
            .or_else(|| self.rehydrate(key, self.now(), false))
    }

    /// Replaces the value with `f(current)` and returns the new value.
    ///
    /// A missing or expired key passes `None` to `f`. An existing entry keeps
    /// its creation time, expiry and access count; its `last_accessed`
    /// moves to now, matching its move to the most-recently-used end. A new
    /// entry gets the default TTL. Statistics are untouched.
    ///
    /// The read, `f` and the write happen under the writer lock, so
    /// concurrent updates of one key never lose each other's result.
    pub fn update<F>(&self, key: &str, f: F) -> V
    where
        F: FnOnce(Option<V>) -> V,
    {
        let _write = self.writer.lock();
        let current = self.live_entry(key);
        let (old_value, old_meta) = match current {
            Some(entry) => (Some(entry.value), Some(entry.metadata)),
            None => (None, None),
        };

        let new_value = f(old_value);
        let entry = match old_meta {
            Some(mut metadata) => {
                metadata.size_estimate = estimate_size(&new_value);
                metadata.last_accessed = self.now();
                CacheEntry {
                    value: new_value.clone(),
                    metadata,
                }
            }
            None => CacheEntry::new(new_value.clone(), self.now(), self.config.ttl),
        };
        self.insert_entry(key, entry, true);
        new_value
    }

    /// Returns the cached value, or runs `loader`, caches its result and
    /// returns it.
    ///
    /// A loader error is returned unchanged and nothing is cached. Concurrent
    /// callers for the same missing key each run their own loader.
    ///
    /// # Examples
    ///
    /// ```
    /// use statecache_core::{CacheConfig, CacheManager};
    /// use serde_json::{json, Value};
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let cache: CacheManager<Value> = CacheManager::new(CacheConfig::default());
    /// let user = cache
    ///     .get_or_load("user:1", || async { Ok::<_, std::io::Error>(json!({"id": 1})) })
    ///     .await
    ///     .unwrap();
    /// assert_eq!(user, json!({"id": 1}));
    /// # });
    /// ```
    pub async fn get_or_load<F, Fut, E>(&self, key: &str, loader: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = loader().await?;
        self.set(key, value.clone());
        Ok(value)
    }

    /// Runs `loader` and stores every pair it yields. Returns how many
    /// entries were written.
    pub async fn warmup<F, Fut, I, K, E>(&self, loader: F) -> Result<usize, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<I, E>>,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
    {
        let entries = loader().await?;
        let mut count = 0;
        for (key, value) in entries {
            self.set(key.as_ref(), value);
            count += 1;
        }
        debug!(count, "cache warmed up");
        Ok(count)
    }

    /// A snapshot of the counters since the last [`clear`](Self::clear).
    pub fn get_stats(&self) -> CacheStats {
        self.stats.clone()
    }

    /// Live counters.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Metadata of a live entry.
    pub fn get_metadata(&self, key: &str) -> Option<EntryMetadata> {
        self.peek(key).map(|e| e.metadata)
    }

    /// Drops every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let _write = self.writer.lock();
        let now = self.now();
        let expired = {
            let mut order = self.order.lock();
            let mut map = self.map.write();
            purge_expired_locked(&mut map, &mut order, now)
        };
        for key in &expired {
            self.stats.record_expiration();
            self.unmirror(key);
        }
        expired.len()
    }

    /// Captures every live entry with its metadata.
    pub fn export(&self) -> CacheSnapshot<V> {
        let now = self.now();
        let map = self.map.read();
        let data = map
            .iter()
            .filter(|(_, e)| !e.is_expired(now))
            .map(|(k, e)| {
                (
                    k.clone(),
                    SnapshotEntry {
                        value: e.value.clone(),
                        metadata: (&e.metadata).into(),
                    },
                )
            })
            .collect();

        CacheSnapshot {
            version: SNAPSHOT_VERSION.to_string(),
            timestamp: now,
            data,
        }
    }

    /// Restores entries from a snapshot, keeping their metadata.
    ///
    /// Entries are inserted oldest-access first so the recency order
    /// survives the round trip; entries already expired are skipped.
    /// Limits and eviction apply as for any insert. Returns how many
    /// entries were restored.
    pub fn import(&self, snapshot: CacheSnapshot<V>) -> usize {
        let now = self.now();
        let mut entries: Vec<(String, CacheEntry<V>)> = snapshot
            .data
            .into_iter()
            .map(|(key, entry)| {
                let size = estimate_size(&entry.value);
                let metadata = entry.metadata.resolve(now, self.config.ttl, size);
                (
                    key,
                    CacheEntry {
                        value: entry.value,
                        metadata,
                    },
                )
            })
            .filter(|(_, e)| !e.is_expired(now))
            .collect();
        entries.sort_by_key(|(_, e)| e.metadata.last_accessed);

        let count = entries.len();
        for (key, entry) in entries {
            self.insert_entry(&key, entry, true);
        }
        debug!(count, version = %snapshot.version, "imported cache snapshot");
        count
    }

    pub fn export_json(&self) -> Result<String, CacheError> {
        Ok(serde_json::to_string(&self.export())?)
    }

    pub fn import_json(&self, json: &str) -> Result<usize, CacheError> {
        let snapshot: CacheSnapshot<V> = serde_json::from_str(json)?;
        Ok(self.import(snapshot))
    }

    /// Inserts a fully built entry, making room first.
    ///
    /// 1. A value larger than `max_memory` is not stored (and any previous
    ///    value for the key is dropped)
    /// 2. Inserting a new key at `max_size` first purges expired entries,
    ///    then evicts by policy until there is room
    /// 3. After insertion, entries are evicted by policy until the summed
    ///    size estimates fit `max_memory`
    ///
    /// The incoming key is never chosen as a victim. Storage is updated
    /// before the writer lock is released.
    fn insert_entry(&self, key: &str, entry: CacheEntry<V>, mirror: bool) {
        let _write = self.writer.lock();
        let now = self.now();
        let mut removed = Removed::default();

        let stored = {
            let mut order = self.order.lock();
            let mut map = self.map.write();
            self.make_room_and_insert(&mut map, &mut order, key, entry, now, &mut removed)
        };

        for k in &removed.expired {
            self.stats.record_expiration();
            self.unmirror(k);
        }
        for k in &removed.evicted {
            self.stats.record_eviction();
            debug!(key = %k, policy = ?self.config.policy, "evicted cache entry");
            self.unmirror(k);
        }
        if let Some(k) = &removed.dropped {
            self.unmirror(k);
        }

        if mirror {
            if let Some(entry) = stored {
                self.mirror(key, &entry);
            }
        }
    }

    fn make_room_and_insert(
        &self,
        map: &mut HashMap<String, CacheEntry<V>>,
        order: &mut VecDeque<String>,
        key: &str,
        entry: CacheEntry<V>,
        now: u64,
        removed: &mut Removed,
    ) -> Option<CacheEntry<V>> {
        if let Some(max_mem) = self.config.max_memory {
            if entry.metadata.size_estimate > max_mem {
                debug!(
                    key,
                    size = entry.metadata.size_estimate,
                    max_mem,
                    "value exceeds max_memory, not cached"
                );
                if remove_key(map, order, key).is_some() {
                    removed.dropped = Some(key.to_string());
                }
                return None;
            }
        }

        if let Some(max_size) = self.config.max_size {
            if max_size == 0 {
                return None;
            }
            if !map.contains_key(key) && map.len() >= max_size {
                removed
                    .expired
                    .extend(purge_expired_locked(map, order, now));
                while map.len() >= max_size {
                    match select_eviction_key(self.config.policy, map, order, Some(key)) {
                        Some(victim) => {
                            remove_key(map, order, &victim);
                            removed.evicted.push(victim);
                        }
                        None => break,
                    }
                }
            }
        }

        map.insert(key.to_string(), entry.clone());
        if let Some(pos) = order.iter().position(|k| k == key) {
            order.remove(pos);
        }
        order.push_back(key.to_string());

        if let Some(max_mem) = self.config.max_memory {
            if total_size(map) > max_mem {
                removed
                    .expired
                    .extend(purge_expired_locked(map, order, now));
            }
            while total_size(map) > max_mem {
                match select_eviction_key(self.config.policy, map, order, Some(key)) {
                    Some(victim) => {
                        remove_key(map, order, &victim);
                        removed.evicted.push(victim);
                    }
                    None => break,
                }
            }
        }

        Some(entry)
    }

    fn storage(&self) -> Option<&Arc<dyn Storage>> {
        match &self.config.storage {
            StorageMode::Persistent(storage) => Some(storage),
            StorageMode::Memory => None,
        }
    }

    fn mirror(&self, key: &str, entry: &CacheEntry<V>) {
        let Some(storage) = self.storage() else {
            return;
        };
        let storage_key = format!("{CACHE_KEY_PREFIX}{key}");
        let result = serde_json::to_string(entry)
            .map_err(crate::StorageError::from)
            .and_then(|json| storage.set_item(&storage_key, &json));
        if let Err(err) = result {
            warn!(key = %storage_key, error = %err, "failed to mirror cache entry");
        }
    }

    fn unmirror(&self, key: &str) {
        let Some(storage) = self.storage() else {
            return;
        };
        let storage_key = format!("{CACHE_KEY_PREFIX}{key}");
        if let Err(err) = storage.remove_item(&storage_key) {
            warn!(key = %storage_key, error = %err, "failed to remove mirrored cache entry");
        }
    }

    fn read_mirror(&self, key: &str) -> Option<CacheEntry<V>> {
        let storage = self.storage()?;
        let storage_key = format!("{CACHE_KEY_PREFIX}{key}");
        let text = match storage.get_item(&storage_key) {
            Ok(text) => text?,
            Err(err) => {
                warn!(key = %storage_key, error = %err, "failed to read mirrored cache entry");
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(key = %storage_key, error = %err, "discarding unreadable mirrored cache entry");
                None
            }
        }
    }

    /// Pulls a live entry back from persistent storage after an in-memory
    /// miss (e.g. after a restart). `touch` counts the load as an access.
    /// Callers hold the writer lock.
    fn rehydrate(&self, key: &str, now: u64, touch: bool) -> Option<CacheEntry<V>> {
        let mut entry = self.read_mirror(key)?;
        if entry.is_expired(now) {
            self.stats.record_expiration();
            self.unmirror(key);
            return None;
        }
        if touch {
            entry.metadata.touch(now);
        }
        self.insert_entry(key, entry.clone(), false);
        Some(entry)
    }
}

impl Default for CacheManager<Value> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

fn purge_expired_locked<V>(
    map: &mut HashMap<String, CacheEntry<V>>,
    order: &mut VecDeque<String>,
    now: u64,
) -> Vec<String> {
    let expired: Vec<String> = map
        .iter()
        .filter(|(_, e)| e.is_expired(now))
        .map(|(k, _)| k.clone())
        .collect();
    for key in &expired {
        remove_key(map, order, key);
    }
    expired
}

fn total_size<V>(map: &HashMap<String, CacheEntry<V>>) -> usize {
    map.values().map(|e| e.metadata.size_estimate).sum()
}
