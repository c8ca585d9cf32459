//! # Statecache Core
//!
//! Core building blocks for the Statecache library: a TTL-bounded key/value
//! cache and a hierarchical reactive state store.
//!
//! ## Features
//!
//! - **Cache Manager**: TTL expiry, size and memory limits, LRU/FIFO/LFU/Random
//!   eviction, hit/miss statistics, batch operations and async loaders
//! - **Snapshots**: export and import of cache contents with entry metadata
//! - **State Manager**: dotted-path reads and writes over nested JSON
//! - **Listeners**: change notifications that fire only on actual changes
//! - **Computed Values**: derived state kept in sync with its dependencies
//! - **History**: linear undo/redo over whole-store snapshots
//! - **Persistence**: pluggable [`Storage`] backends (memory, JSON file)
//!
//! ## Module Organization
//!
//! - [`cache_entry`] - Entry wrapper with TTL and access metadata
//! - [`eviction_policy`] - Eviction strategies
//! - [`cache_manager`] - The cache itself
//! - [`snapshot`] - Export/import wire format
//! - [`path`] - Dotted-path parsing and resolution
//! - [`listeners`] - Listener registry
//! - [`history`] - Undo/redo snapshots
//! - [`state_manager`] - The state store
//! - [`storage`] - Persistence backends
//!
pub mod cache_entry;
pub mod cache_manager;
pub mod eviction_policy;
pub mod history;
pub mod listeners;
pub mod path;
pub mod snapshot;
pub mod state_manager;
pub mod storage;
pub mod utils;

mod clock;
mod error;
mod stats;

pub use cache_entry::{CacheEntry, EntryMetadata, Ttl};
pub use cache_manager::{CacheConfig, CacheManager, StorageMode, CACHE_KEY_PREFIX};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CacheError, StateError, StorageError};
pub use eviction_policy::EvictionPolicy;
pub use history::History;
pub use listeners::{Listener, ListenerId};
pub use path::Path;
pub use snapshot::{CacheSnapshot, SnapshotEntry, SnapshotMetadata, SNAPSHOT_VERSION};
pub use state_manager::{SetOptions, StateConfig, StateManager, STATE_KEY_INFIX};
pub use stats::CacheStats;
pub use storage::{FileStorage, MemoryStorage, Storage};
