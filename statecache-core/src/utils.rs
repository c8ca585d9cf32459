use crate::{CacheEntry, EvictionPolicy};
use std::collections::{HashMap, VecDeque};

/// Moves a key to the end of the order queue (marks it as most recently used).
///
/// If the key is not in the queue, the queue is left unchanged.
///
/// # Examples
///
/// ```
/// use std::collections::VecDeque;
/// use statecache_core::utils::move_key_to_end;
///
/// let mut order = VecDeque::from(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
/// move_key_to_end(&mut order, "a");
/// assert_eq!(order, VecDeque::from(vec!["b".to_string(), "c".to_string(), "a".to_string()]));
/// ```
pub fn move_key_to_end(order: &mut VecDeque<String>, key: &str) {
    if let Some(pos) = order.iter().position(|k| k == key) {
        if pos + 1 == order.len() {
            return;
        }
        if let Some(k) = order.remove(pos) {
            order.push_back(k);
        }
    }
}

/// Finds the key with the lowest `access_count`.
///
/// Walks the order queue front to back, so ties resolve to the key closest
/// to the front. Keys in the queue that are missing from the map are skipped.
pub fn find_min_frequency_key<V>(
    map: &HashMap<String, CacheEntry<V>>,
    order: &VecDeque<String>,
) -> Option<String> {
    let mut min: Option<(&String, u64)> = None;
    for key in order {
        if let Some(entry) = map.get(key) {
            let count = entry.metadata.access_count;
            match min {
                Some((_, best)) if best <= count => {}
                _ => min = Some((key, count)),
            }
        }
    }
    min.map(|(k, _)| k.clone())
}

/// Chooses the key the given policy would evict next, never `exclude`.
///
/// LRU and FIFO both take the front of the queue: LRU keeps the queue in
/// recency order by calling [`move_key_to_end`] on every hit, FIFO never
/// reorders it.
pub fn select_eviction_key<V>(
    policy: EvictionPolicy,
    map: &HashMap<String, CacheEntry<V>>,
    order: &VecDeque<String>,
    exclude: Option<&str>,
) -> Option<String> {
    let eligible = |k: &String| map.contains_key(k) && Some(k.as_str()) != exclude;
    match policy {
        EvictionPolicy::LRU | EvictionPolicy::FIFO => {
            order.iter().find(|k| eligible(k)).cloned()
        }
        EvictionPolicy::LFU => {
            let candidates: VecDeque<String> =
                order.iter().filter(|k| eligible(k)).cloned().collect();
            find_min_frequency_key(map, &candidates)
        }
        EvictionPolicy::Random => {
            let candidates: Vec<&String> = order.iter().filter(|k| eligible(k)).collect();
            if candidates.is_empty() {
                None
            } else {
                let pos = fastrand::usize(..candidates.len());
                Some(candidates[pos].clone())
            }
        }
    }
}

/// Removes a key from both the cache map and the order queue.
///
/// Returns the removed entry, if the map held one.
pub fn remove_key<V>(
    map: &mut HashMap<String, CacheEntry<V>>,
    order: &mut VecDeque<String>,
    key: &str,
) -> Option<CacheEntry<V>> {
    if let Some(pos) = order.iter().position(|k| k == key) {
        order.remove(pos);
    }
    map.remove(key)
}
