use statecache::{json, CacheConfig, CacheManager, EvictionPolicy, Value};
use std::time::Duration;

/// Example walking through the cache manager: limits, eviction, statistics,
/// async loaders and snapshots.
///
/// Run with `RUST_LOG=statecache_core=debug` to see evictions as they happen.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "statecache_core=info".into()),
        )
        .init();

    println!("=== Cache Manager Example ===\n");

    let cache: CacheManager<Value> = CacheManager::new(
        CacheConfig::default()
            .max_size(3)
            .ttl(Duration::from_secs(60))
            .policy(EvictionPolicy::LRU),
    );

    println!("--- LRU eviction (max_size = 3) ---");
    cache.set("a", json!(1));
    cache.set("b", json!(2));
    cache.set("c", json!(3));
    let _ = cache.get("a");
    cache.set("d", json!(4));
    println!("Live keys: {:?}", cache.keys());
    println!("'b' evicted: {}", !cache.has("b"));

    println!("\n--- Loaders ---");
    for attempt in 1..=2 {
        let user = cache
            .get_or_load("user:42", || async {
                println!("  (loading user:42 from the backend)");
                Ok::<_, std::io::Error>(json!({"id": 42, "name": "Ada"}))
            })
            .await;
        match user {
            Ok(user) => println!("Attempt {}: {}", attempt, user),
            Err(err) => println!("Attempt {}: failed: {}", attempt, err),
        }
    }

    println!("\n--- Statistics ---");
    let _ = cache.get("missing");
    let stats = cache.get_stats();
    println!("Hits: {}", stats.hits());
    println!("Misses: {}", stats.misses());
    println!("Evictions: {}", stats.evictions());
    println!("Hit rate: {:.1}%", stats.hit_rate() * 100.0);

    println!("\n--- Export / import ---");
    match cache.export_json() {
        Ok(snapshot) => {
            let copy: CacheManager<Value> = CacheManager::new(CacheConfig::default());
            match copy.import_json(&snapshot) {
                Ok(count) => println!("Imported {} entries: {:?}", count, copy.keys()),
                Err(err) => println!("Import failed: {}", err),
            }
        }
        Err(err) => println!("Export failed: {}", err),
    }
}
