//! # spacekv - A Namespaced In-Memory Key-Value Storage Engine
//!
//! spacekv stores opaque byte values under (space, key) pairs. Every
//! entry carries creation/modification timestamps, an optional absolute
//! expiration time, and a monotonically increasing per-key version.
//! Reads transparently hide expired entries.
//!
//! ## Features
//!
//! - **Isolated Spaces**: case-sensitive namespaces, created lazily on
//!   first write, deleted with cascade
//! - **Versioned Entries**: every overwrite bumps a per-key counter by
//!   exactly 1; delete or expiry resets the key's history
//! - **TTL Support**: entries can expire at an absolute wall-clock time,
//!   hidden lazily on read and reclaimed by a background reaper
//! - **Concurrent**: sharded RwLock storage with atomic per-key
//!   read-modify-write
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                           spacekv                              │
//! │                                                                │
//! │  ┌──────────────┐    ┌───────────────┐    ┌─────────────────┐  │
//! │  │ Transport /  │───>│ KeyValueStore │───>│  SpaceRegistry  │  │
//! │  │ REST caller  │    │   (facade)    │    │                 │  │
//! │  └──────┬───────┘    └───────────────┘    │ ┌─────┐ ┌─────┐ │  │
//! │         │                                 │ │Space│ │Space│ │  │
//! │         ▼                                 │ │     │ │     │ │  │
//! │  ┌──────────────┐                         │ └─────┘ └─────┘ │  │
//! │  │ Value Codec  │                         └────────▲────────┘  │
//! │  │ typed⇄bytes  │                                  │           │
//! │  └──────────────┘             ┌───────────────────┴─────────┐  │
//! │                               │           Reaper            │  │
//! │                               │   (Background Tokio Task)   │  │
//! │                               └─────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use spacekv::{KeyValueStore, ReaperConfig};
//! use bytes::Bytes;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! // One store per process, explicitly owned.
//! let store = KeyValueStore::new();
//!
//! // Reclaim expired entries in the background.
//! let _reaper = store.start_reaper(ReaperConfig::default());
//!
//! // Writes create the space on demand and return entry metadata.
//! let meta = store.set("sessions", "user:42", Bytes::from("token"), None).unwrap();
//! assert_eq!(meta.version, 1);
//!
//! // Reads return the value plus its metadata.
//! let stored = store.get("sessions", "user:42").unwrap();
//! assert_eq!(stored.value, Bytes::from("token"));
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: spaces, entries, versioning, and the expiration reaper
//! - [`facade`]: the public operation surface consumed by transports
//! - [`codec`]: typed application values to/from opaque tagged bytes
//!
//! ## Design Highlights
//!
//! ### Per-Key Atomicity
//!
//! The check-exists / bump-version / write sequence of `set` runs under
//! a single shard write lock, so N concurrent writers to one key always
//! observe N distinct consecutive versions.
//!
//! ### Lazy + Active Expiry
//!
//! Entries with an expiration are hidden in two ways:
//! 1. **Lazy**: every read checks the wall clock and treats expired
//!    entries as absent
//! 2. **Active**: a background task periodically removes them physically
//!
//! Lazy expiry alone is sufficient for correctness; the reaper only
//! bounds memory growth from entries that are never read again.

pub mod codec;
pub mod facade;
pub mod storage;

// Re-export commonly used types for convenience
pub use codec::{AppValue, CodecError};
pub use facade::{KeyValueStore, StoreStats, StoredValue};
pub use storage::{
    now_millis, start_reaper, Entry, EpochMillis, Reaper, ReaperConfig, Space, SpaceRegistry,
    StorageError, StoreConfig, ValueMeta,
};

/// Version of spacekv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
