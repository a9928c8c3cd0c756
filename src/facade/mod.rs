//! Storage Facade
//!
//! [`KeyValueStore`] is the public operation surface consumed by the
//! transport layer. It composes the space registry, the per-space entry
//! stores and the reaper into the exact operation set the outside world
//! sees, and translates engine results into transport-agnostic ones:
//!
//! | Operation       | Input                            | Output                |
//! |-----------------|----------------------------------|-----------------------|
//! | `spaces`        | (none)                           | space names           |
//! | `keys`          | space                            | live key names        |
//! | `delete_space`  | space                            | idempotent            |
//! | `set`           | space, key, bytes, expiration?   | [`ValueMeta`]         |
//! | `get`           | space, key                       | `Option<StoredValue>` |
//! | `delete_key`    | space, key                       | idempotent            |
//!
//! Every call is synchronous and blocks only for bounded local time.
//! Lookup misses surface as empty results, never as errors; write-time
//! validation failures reject the write with a typed [`StorageError`].

use crate::storage::registry::{SpaceRegistry, StoreConfig};
use crate::storage::reaper::{Reaper, ReaperConfig};
use crate::storage::space::{Entry, EpochMillis, StorageError, ValueMeta};
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A read result: the stored value bytes plus their metadata.
#[derive(Debug, Clone)]
pub struct StoredValue {
    /// The opaque value bytes
    pub value: Bytes,
    /// Entry metadata as of the read
    pub meta: ValueMeta,
}

impl From<Entry> for StoredValue {
    fn from(entry: Entry) -> Self {
        let meta = entry.meta();
        Self {
            value: entry.value,
            meta,
        }
    }
}

/// Store-wide operation statistics.
#[derive(Debug, Clone, Copy)]
pub struct StoreStats {
    /// Number of live spaces
    pub spaces: usize,
    /// Total get operations served
    pub get_ops: u64,
    /// Total set operations served
    pub set_ops: u64,
    /// Total delete operations served (keys and spaces)
    pub del_ops: u64,
    /// Total entries removed because they expired (lazy or reaped)
    pub expired: u64,
}

/// The public storage surface.
///
/// Explicitly constructed and explicitly owned: create one store per
/// process, wrap it in an `Arc`, and hand clones to the transport layer
/// and the reaper.
///
/// # Example
///
/// ```
/// use spacekv::KeyValueStore;
/// use bytes::Bytes;
///
/// let store = KeyValueStore::new();
///
/// let meta = store.set("cache", "greeting", Bytes::from("hello"), None).unwrap();
/// assert_eq!(meta.version, 1);
///
/// let stored = store.get("cache", "greeting").unwrap();
/// assert_eq!(stored.value, Bytes::from("hello"));
/// ```
#[derive(Debug)]
pub struct KeyValueStore {
    registry: Arc<SpaceRegistry>,

    /// Statistics: total get operations
    get_count: AtomicU64,

    /// Statistics: total set operations
    set_count: AtomicU64,

    /// Statistics: total delete operations
    del_count: AtomicU64,
}

impl Default for KeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore {
    /// Creates a store with default configuration.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates a store with the given configuration.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            registry: Arc::new(SpaceRegistry::new(config)),
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
        }
    }

    /// The registry backing this store.
    pub fn registry(&self) -> &Arc<SpaceRegistry> {
        &self.registry
    }

    /// Starts the background expiration reaper for this store.
    ///
    /// The reaper stops when the returned handle is dropped.
    pub fn start_reaper(&self, config: ReaperConfig) -> Reaper {
        Reaper::start(Arc::clone(&self.registry), config)
    }

    /// Returns the names of all live spaces.
    pub fn spaces(&self) -> Vec<String> {
        self.registry.spaces()
    }

    /// Returns the live keys of `space`; empty for an unknown space.
    pub fn keys(&self, space: &str) -> Vec<String> {
        self.registry
            .get_space(space)
            .map(|s| s.keys())
            .unwrap_or_default()
    }

    /// Deletes `space` and all its entries. Idempotent.
    pub fn delete_space(&self, space: &str) {
        self.del_count.fetch_add(1, Ordering::Relaxed);
        self.registry.delete_space(space);
    }

    /// Writes a value, creating the space on first write.
    ///
    /// Returns the resulting entry metadata, or a typed error if the
    /// expiration is invalid or the version counter would overflow.
    pub fn set(
        &self,
        space: &str,
        key: &str,
        value: Bytes,
        expired_at: Option<EpochMillis>,
    ) -> Result<ValueMeta, StorageError> {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let meta = self.registry.ensure_space(space).set(key, value, expired_at)?;
        debug!(
            space = space,
            key = key,
            version = meta.version,
            "value set"
        );
        Ok(meta)
    }

    /// Reads a value and its metadata.
    ///
    /// Returns `None` if the space or key is unknown, the key was
    /// deleted, or the entry has expired.
    pub fn get(&self, space: &str, key: &str) -> Option<StoredValue> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        self.registry
            .get_space(space)?
            .get(key)
            .map(StoredValue::from)
    }

    /// Deletes one key. Idempotent; unknown spaces and keys are no-ops.
    pub fn delete_key(&self, space: &str, key: &str) {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        if let Some(s) = self.registry.get_space(space) {
            if s.delete(key) {
                debug!(space = space, key = key, "key deleted");
            }
        }
    }

    /// Returns store-wide operation statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            spaces: self.registry.spaces().len(),
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            expired: self.registry.expired_total(),
        }
    }
}
