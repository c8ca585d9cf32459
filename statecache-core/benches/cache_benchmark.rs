use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use statecache_core::{CacheConfig, CacheManager, EvictionPolicy, StateManager};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;

fn new_cache(policy: EvictionPolicy, size: usize) -> CacheManager<i64> {
    CacheManager::new(CacheConfig::default().max_size(size).policy(policy))
}

fn bench_insert_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_sequential");

    for size in [10usize, 100, 1000].iter() {
        for policy in [EvictionPolicy::FIFO, EvictionPolicy::LRU] {
            group.bench_with_input(
                BenchmarkId::new(format!("{policy:?}"), size),
                size,
                |b, &size| {
                    b.iter(|| {
                        let cache = new_cache(policy, size);
                        for i in 0..size {
                            cache.set(&format!("key{}", i), black_box(i as i64));
                        }
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_get_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_sequential");

    for size in [10usize, 100, 1000].iter() {
        for policy in [EvictionPolicy::FIFO, EvictionPolicy::LRU] {
            let cache = new_cache(policy, *size);
            for i in 0..*size {
                cache.set(&format!("key{}", i), i as i64);
            }

            group.bench_with_input(
                BenchmarkId::new(format!("{policy:?}"), size),
                size,
                |b, &size| {
                    b.iter(|| {
                        for i in 0..size {
                            black_box(cache.get(&format!("key{}", i)));
                        }
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_eviction(c: &mut Criterion) {
    let mut group = c.benchmark_group("eviction");

    for policy in [
        EvictionPolicy::FIFO,
        EvictionPolicy::LRU,
        EvictionPolicy::LFU,
        EvictionPolicy::Random,
    ] {
        group.bench_function(format!("{policy:?}_eviction"), |b| {
            let cache = new_cache(policy, 100);
            let mut i = 0i64;
            b.iter(|| {
                cache.set(&format!("key{}", i), black_box(i));
                i += 1;
            });
        });
    }

    group.finish();
}

fn bench_concurrent_mixed(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_mixed");

    for threads in [2usize, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(threads),
            threads,
            |b, &threads| {
                b.iter(|| {
                    let cache = Arc::new(new_cache(EvictionPolicy::LRU, 1000));
                    let handles: Vec<_> = (0..threads)
                        .map(|t| {
                            let cache = Arc::clone(&cache);
                            thread::spawn(move || {
                                for i in 0..100 {
                                    let key = format!("key{}", (t * 100 + i) % 200);
                                    if i % 4 == 0 {
                                        cache.set(&key, i as i64);
                                    } else {
                                        black_box(cache.get(&key));
                                    }
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        let _ = handle.join();
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_state_set_with_listeners(c: &mut Criterion) {
    let mut group = c.benchmark_group("state_set");

    for listeners in [0usize, 10, 100].iter() {
        let state = StateManager::new();
        for i in 0..*listeners {
            let _ = state.on(&format!("app.section{}.value", i), |_, _, _| {});
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(listeners),
            listeners,
            |b, _| {
                let mut n = 0;
                b.iter(|| {
                    state.set("app.section0.value", json!(black_box(n)));
                    n += 1;
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_sequential,
    bench_get_sequential,
    bench_eviction,
    bench_concurrent_mixed,
    bench_state_set_with_listeners
);
criterion_main!(benches);
