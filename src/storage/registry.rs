//! Space Registry
//!
//! Tracks the set of live spaces. Spaces are created lazily on the first
//! write targeting them and removed by explicit cascade delete. The
//! registry hands out `Arc<Space>` handles so callers (and the reaper)
//! can operate on a space without holding the registry lock.
//!
//! ## Delete/Write Races
//!
//! A `set` resolves its space handle through the registry, then writes
//! into the space's own shards. If a `delete_space` wins the race, the
//! write lands in the detached space and is dropped with it - lost with
//! the deleted space, never partially visible. A `set` that resolves
//! after the delete recreates the space and lands in the fresh one.

use crate::storage::space::Space;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Default number of shards per space.
/// More shards = less lock contention, but more memory per space.
const DEFAULT_SHARDS_PER_SPACE: usize = 16;

/// Store-wide configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of lock shards each space is split into
    pub shards_per_space: usize,

    /// Whether a space with zero entries keeps appearing in the space
    /// list. When `false`, the reaper garbage-collects empty spaces.
    pub retain_empty_spaces: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            shards_per_space: DEFAULT_SHARDS_PER_SPACE,
            retain_empty_spaces: true,
        }
    }
}

/// The set of live spaces, keyed by case-sensitive name.
#[derive(Debug)]
pub struct SpaceRegistry {
    config: StoreConfig,
    spaces: RwLock<HashMap<String, Arc<Space>>>,

    /// Expired-entry counts carried over from deleted spaces, so the
    /// store-wide total never goes backwards
    expired_carryover: AtomicU64,
}

impl Default for SpaceRegistry {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl SpaceRegistry {
    /// Creates an empty registry with the given configuration.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            spaces: RwLock::new(HashMap::new()),
            expired_carryover: AtomicU64::new(0),
        }
    }

    /// The configuration this registry was created with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the names of all live spaces.
    ///
    /// Order is unspecified; callers must not rely on it.
    pub fn spaces(&self) -> Vec<String> {
        self.spaces.read().unwrap().keys().cloned().collect()
    }

    /// Returns the space handle for `name` without creating it.
    pub fn get_space(&self, name: &str) -> Option<Arc<Space>> {
        self.spaces.read().unwrap().get(name).cloned()
    }

    /// Returns the space handle for `name`, creating the space if absent.
    ///
    /// Idempotent: concurrent callers all end up with a handle to the
    /// same space.
    pub fn ensure_space(&self, name: &str) -> Arc<Space> {
        // Fast path: the space already exists.
        if let Some(space) = self.get_space(name) {
            return space;
        }

        let mut spaces = self.spaces.write().unwrap();
        Arc::clone(
            spaces
                .entry(name.to_string())
                .or_insert_with(|| {
                    debug!(space = name, "space created");
                    Arc::new(Space::new(self.config.shards_per_space))
                }),
        )
    }

    /// Removes the space and all its entries.
    ///
    /// Idempotent no-op if the space does not exist. The cascade is
    /// atomic from the caller's perspective: the handle is unlinked
    /// under the registry write lock and every entry dies with it.
    pub fn delete_space(&self, name: &str) -> bool {
        let removed = self.spaces.write().unwrap().remove(name);
        if let Some(space) = &removed {
            self.expired_carryover
                .fetch_add(space.expired_count(), Ordering::Relaxed);
            debug!(space = name, "space deleted");
        }
        removed.is_some()
    }

    /// Snapshot of all live spaces, for lock-free iteration by the reaper.
    pub fn snapshot(&self) -> Vec<(String, Arc<Space>)> {
        self.spaces
            .read()
            .unwrap()
            .iter()
            .map(|(name, space)| (name.clone(), Arc::clone(space)))
            .collect()
    }

    /// Garbage-collects spaces with no physically present entries.
    ///
    /// Only meaningful when `retain_empty_spaces` is off; the reaper
    /// calls this after a sweep. A space with outstanding handles is
    /// never collected: a writer between `ensure_space` and its shard
    /// write still holds an `Arc`, and collecting the space under it
    /// would acknowledge a write no read could ever see. Returns the
    /// number of spaces removed.
    pub fn remove_empty_spaces(&self) -> usize {
        let mut spaces = self.spaces.write().unwrap();
        let before = spaces.len();
        spaces.retain(|name, space| {
            let keep = !space.is_empty() || Arc::strong_count(space) > 1;
            if !keep {
                self.expired_carryover
                    .fetch_add(space.expired_count(), Ordering::Relaxed);
                debug!(space = name.as_str(), "empty space garbage-collected");
            }
            keep
        });
        before - spaces.len()
    }

    /// Total entries removed because they expired, including entries
    /// of spaces that have since been deleted.
    pub fn expired_total(&self) -> u64 {
        let live: u64 = self
            .spaces
            .read()
            .unwrap()
            .values()
            .map(|space| space.expired_count())
            .sum();
        self.expired_carryover.load(Ordering::Relaxed) + live
    }
}
