//! # Statecache
//!
//! An in-process TTL/LRU cache and a reactive, path-addressed state store
//! for Rust applications.
//!
//! ## Features
//!
//! - **Cache**: per-entry TTL, size and memory limits, pluggable eviction
//!   policies, hit/miss statistics, async loaders, export/import
//! - **State**: dotted-path reads and writes, change listeners, batches,
//!   computed values, undo/redo history
//! - **Persistence**: both managers can mirror to a [`Storage`] backend
//! - **Thread-safe**: every operation takes `&self`; share managers by `Arc`
//!
//! ## Quick Start
//!
//! ```rust
//! use statecache::{json, CacheConfig, CacheManager};
//! use std::time::Duration;
//!
//! let cache = CacheManager::new(
//!     CacheConfig::default()
//!         .max_size(100)
//!         .ttl(Duration::from_secs(60)),
//! );
//!
//! cache.set("user:1", json!({"name": "Ada"}));
//! assert_eq!(cache.get("user:1"), Some(json!({"name": "Ada"})));
//! assert_eq!(cache.get("user:2"), None);
//!
//! let stats = cache.get_stats();
//! assert_eq!(stats.hits(), 1);
//! assert_eq!(stats.misses(), 1);
//! ```
//!
//! ## State Store
//!
//! ```rust
//! use statecache::{json, StateManager};
//!
//! let state = StateManager::new();
//! state.set("cart.price", 100);
//! state.set("cart.quantity", 2);
//! state.computed("cart.total", &["cart.price", "cart.quantity"], |deps| {
//!     let price = deps[0].as_ref().and_then(|v| v.as_i64()).unwrap_or(0);
//!     let quantity = deps[1].as_ref().and_then(|v| v.as_i64()).unwrap_or(0);
//!     json!(price * quantity)
//! });
//!
//! state.set("cart.quantity", 3);
//! assert_eq!(state.get("cart.total"), Some(json!(300)));
//! ```
//!
//! ## Undo / Redo
//!
//! ```rust
//! use statecache::{json, StateManager};
//!
//! let state = StateManager::new();
//! state.enable_history();
//! state.set("counter", 1);
//! state.set("counter", 2);
//!
//! state.undo();
//! assert_eq!(state.get("counter"), Some(json!(1)));
//! state.redo();
//! assert_eq!(state.get("counter"), Some(json!(2)));
//! ```
//!
//! ## Persistence
//!
//! ```rust
//! use statecache::{json, MemoryStorage, SetOptions, StateConfig, StateManager};
//! use std::sync::Arc;
//!
//! let storage = Arc::new(MemoryStorage::new());
//! let config = StateConfig::default().storage(storage);
//!
//! let state = StateManager::with_config(config.clone());
//! state.set_with("prefs.theme", "dark", SetOptions::persist());
//!
//! let restored = StateManager::with_config(config);
//! assert!(restored.load_from_storage("prefs.theme"));
//! assert_eq!(restored.get("prefs.theme"), Some(json!("dark")));
//! ```
//!
//! ## Logging
//!
//! Evictions, history moves and storage failures are reported through
//! [`tracing`](https://docs.rs/tracing). Install any subscriber to see them.

pub use serde_json::{json, Value};
pub use statecache_core::*;
