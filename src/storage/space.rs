//! Per-Space Entry Store
//!
//! A [`Space`] is one isolated key namespace: a mapping from key to
//! [`Entry`], where every entry carries creation/modification timestamps,
//! an optional absolute expiration time, and a per-key version counter.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: keys are hashed across independent shards so
//!    unrelated keys never contend on the same lock.
//! 2. **Per-Key Atomicity**: the check-exists / bump-version / write
//!    sequence of `set` runs entirely under one shard write lock, so
//!    concurrent writers to the same key always observe distinct,
//!    consecutive versions.
//! 3. **Lazy Expiry**: reads check `expired_at` against the wall clock
//!    and treat expired entries as absent, removing them opportunistically.
//!    The background reaper handles entries that are never read again.
//! 4. **Wall-Clock Timestamps**: all times are integer milliseconds since
//!    the Unix epoch, which is exactly what crosses the transport boundary.
//!
//! ## Version Semantics
//!
//! A key's version starts at 1 on creation and increments by exactly 1 on
//! every overwrite of a live entry. Expiration is a full delete: a key
//! that expires and is later re-created starts a new entry at version 1.

use bytes::Bytes;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Wall-clock timestamp: milliseconds since the Unix epoch.
pub type EpochMillis = u64;

/// Returns the current wall-clock time in milliseconds since the epoch.
pub fn now_millis() -> EpochMillis {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as EpochMillis
}

/// Errors raised by write operations on the entry store.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StorageError {
    /// The requested expiration time is not in the future.
    ///
    /// The write is rejected entirely: no metadata update occurs.
    #[error("expiration time {expired_at}ms is not after current time {now}ms")]
    InvalidExpiration { expired_at: EpochMillis, now: EpochMillis },

    /// The per-key version counter would overflow.
    ///
    /// Fatal to this single operation only; the existing entry is left
    /// untouched.
    #[error("version counter overflow for key {key:?}")]
    VersionOverflow { key: String },
}

/// A stored value plus its metadata for one (space, key) pair.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The opaque value bytes (possibly empty, never absent once set)
    pub value: Bytes,
    /// Set once, at the first successful write for this key
    pub created_at: EpochMillis,
    /// Updated on every successful write
    pub modified_at: EpochMillis,
    /// Absolute expiration time; `None` means the entry never expires
    pub expired_at: Option<EpochMillis>,
    /// Starts at 1 on creation, +1 on every overwrite of a live entry
    pub version: u64,
}

impl Entry {
    fn new(value: Bytes, expired_at: Option<EpochMillis>, now: EpochMillis) -> Self {
        Self {
            value,
            created_at: now,
            modified_at: now,
            expired_at,
            version: 1,
        }
    }

    /// Checks whether this entry is logically absent as of `now`.
    #[inline]
    pub fn is_expired_at(&self, now: EpochMillis) -> bool {
        self.expired_at.map(|exp| exp <= now).unwrap_or(false)
    }

    /// Returns the metadata view of this entry.
    pub fn meta(&self) -> ValueMeta {
        ValueMeta {
            created_at: self.created_at,
            modified_at: self.modified_at,
            expired_at: self.expired_at,
            version: self.version,
        }
    }
}

/// Entry metadata returned from writes and alongside reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueMeta {
    /// When the entry was first created
    pub created_at: EpochMillis,
    /// When the entry was last written
    pub modified_at: EpochMillis,
    /// Absolute expiration time, if any
    pub expired_at: Option<EpochMillis>,
    /// Per-key monotonic version
    pub version: u64,
}

/// One isolated key namespace.
///
/// # Thread Safety
///
/// Designed to be wrapped in an `Arc` and shared across concurrent
/// request handlers. All operations are thread-safe; per-key
/// read-modify-write is atomic under the owning shard's write lock.
pub struct Space {
    /// Sharded storage for reduced lock contention
    shards: Vec<RwLock<HashMap<String, Entry>>>,

    /// Entries removed because they expired (lazy or swept)
    expired_count: AtomicU64,
}

impl std::fmt::Debug for Space {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Space")
            .field("shards", &self.shards.len())
            .field("expired_count", &self.expired_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Space {
    /// Creates an empty space with the given number of shards.
    pub fn new(shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect();

        Self {
            shards,
            expired_count: AtomicU64::new(0),
        }
    }

    #[inline]
    fn shard(&self, key: &str) -> &RwLock<HashMap<String, Entry>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    /// Writes a value, creating or overwriting the entry for `key`.
    ///
    /// If no live entry exists the new entry starts at version 1 with
    /// `created_at = modified_at = now`. If a live entry exists its value
    /// is replaced, `modified_at` is updated, the version increments by 1
    /// and `expired_at` is replaced. This is the sole mutation entry
    /// point; there are no partial updates.
    ///
    /// An `expired_at` at or before the current time rejects the write
    /// with [`StorageError::InvalidExpiration`].
    pub fn set(
        &self,
        key: &str,
        value: Bytes,
        expired_at: Option<EpochMillis>,
    ) -> Result<ValueMeta, StorageError> {
        let now = now_millis();
        if let Some(exp) = expired_at {
            if exp <= now {
                return Err(StorageError::InvalidExpiration {
                    expired_at: exp,
                    now,
                });
            }
        }

        let mut data = self.shard(key).write().unwrap();

        if let Some(entry) = data.get_mut(key) {
            if !entry.is_expired_at(now) {
                // Overwrite of a live entry: bump the version in place.
                let version =
                    entry
                        .version
                        .checked_add(1)
                        .ok_or_else(|| StorageError::VersionOverflow {
                            key: key.to_string(),
                        })?;
                entry.value = value;
                entry.modified_at = now;
                entry.expired_at = expired_at;
                entry.version = version;
                return Ok(entry.meta());
            }
            self.expired_count.fetch_add(1, Ordering::Relaxed);
        }

        // Absent or expired: expiration is a full delete, so the key
        // starts over as a fresh entry at version 1.
        let entry = Entry::new(value, expired_at, now);
        let meta = entry.meta();
        data.insert(key.to_string(), entry);
        Ok(meta)
    }

    /// Returns the entry for `key`, or `None` if it never existed, was
    /// deleted, or has expired as of now.
    ///
    /// Implements lazy expiry: an expired entry behaves as absent even
    /// before the reaper has physically removed it, and is removed here
    /// opportunistically.
    pub fn get(&self, key: &str) -> Option<Entry> {
        let now = now_millis();
        let shard = self.shard(key);

        // Fast path: read lock for live entries.
        {
            let data = shard.read().unwrap();
            match data.get(key) {
                Some(entry) if !entry.is_expired_at(now) => return Some(entry.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Key exists but is expired: take the write lock and remove it.
        let mut data = shard.write().unwrap();
        if let Some(entry) = data.get(key) {
            if entry.is_expired_at(now) {
                data.remove(key);
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            // Race: another writer recreated the key in the meantime.
            return Some(entry.clone());
        }

        None
    }

    /// Removes the entry for `key`.
    ///
    /// Returns `true` if a live entry was removed; idempotent no-op
    /// otherwise.
    pub fn delete(&self, key: &str) -> bool {
        let now = now_millis();
        let mut data = self.shard(key).write().unwrap();

        match data.remove(key) {
            Some(entry) if !entry.is_expired_at(now) => true,
            Some(_) => {
                // Removed an already-expired entry: counts as expiry, not delete.
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                false
            }
            None => false,
        }
    }

    /// Returns all keys with a currently-live entry.
    ///
    /// Order is unspecified; callers must not rely on it.
    pub fn keys(&self) -> Vec<String> {
        let now = now_millis();
        let mut result = Vec::new();

        for shard in &self.shards {
            let data = shard.read().unwrap();
            for (key, entry) in data.iter() {
                if !entry.is_expired_at(now) {
                    result.push(key.clone());
                }
            }
        }

        result
    }

    /// Returns the number of physically present entries, expired or not.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.read().unwrap().len())
            .sum()
    }

    /// Returns `true` if no entries are physically present.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().unwrap().is_empty())
    }

    /// Total entries removed from this space because they expired.
    pub fn expired_count(&self) -> u64 {
        self.expired_count.load(Ordering::Relaxed)
    }

    /// Physically removes all expired entries.
    ///
    /// Called by the background reaper. Takes one shard write lock at a
    /// time so foreground operations on other shards are never starved.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self) -> u64 {
        let now = now_millis();
        let mut removed = 0u64;

        for shard in &self.shards {
            let mut data = shard.write().unwrap();
            let before = data.len();
            data.retain(|_, entry| !entry.is_expired_at(now));
            removed += (before - data.len()) as u64;
        }

        if removed > 0 {
            self.expired_count.fetch_add(removed, Ordering::Relaxed);
        }

        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn space() -> Space {
        Space::new(16)
    }

    #[test]
    fn test_set_and_get() {
        let space = space();

        let meta = space.set("key", Bytes::from("value"), None).unwrap();
        assert_eq!(meta.version, 1);
        assert_eq!(meta.created_at, meta.modified_at);
        assert_eq!(meta.expired_at, None);

        let entry = space.get("key").unwrap();
        assert_eq!(entry.value, Bytes::from("value"));
        assert_eq!(entry.version, 1);
    }

    #[test]
    fn test_get_nonexistent() {
        let space = space();
        assert!(space.get("nonexistent").is_none());
    }

    #[test]
    fn test_overwrite_bumps_version() {
        let space = space();

        let first = space.set("key", Bytes::from("v1"), None).unwrap();
        assert_eq!(first.version, 1);

        // Make sure the wall clock has advanced between the writes.
        thread::sleep(Duration::from_millis(5));

        let second = space.set("key", Bytes::from("v2"), None).unwrap();
        assert_eq!(second.version, 2);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.modified_at > first.modified_at);

        let entry = space.get("key").unwrap();
        assert_eq!(entry.value, Bytes::from("v2"));
        assert_eq!(entry.version, 2);
    }

    #[test]
    fn test_delete_resets_version() {
        let space = space();

        space.set("key", Bytes::from("v1"), None).unwrap();
        space.set("key", Bytes::from("v2"), None).unwrap();

        assert!(space.delete("key"));
        assert!(space.get("key").is_none());
        assert!(!space.delete("key")); // Already deleted

        // Re-creation starts a fresh entry at version 1.
        let meta = space.set("key", Bytes::from("v3"), None).unwrap();
        assert_eq!(meta.version, 1);
    }

    #[test]
    fn test_past_expiration_rejected() {
        let space = space();

        let past = now_millis() - 1_000;
        let err = space.set("key", Bytes::from("x"), Some(past)).unwrap_err();
        assert!(matches!(err, StorageError::InvalidExpiration { .. }));

        // The rejected write must not leave anything behind.
        assert!(space.get("key").is_none());
        assert!(space.keys().is_empty());
    }

    #[test]
    fn test_lazy_expiry_on_get_and_keys() {
        let space = space();

        space
            .set("short", Bytes::from("v"), Some(now_millis() + 30))
            .unwrap();
        space.set("long", Bytes::from("v"), None).unwrap();

        assert!(space.get("short").is_some());
        assert_eq!(space.keys().len(), 2);

        thread::sleep(Duration::from_millis(60));

        // No sweep has run: lazy expiry alone must hide the entry.
        assert!(space.get("short").is_none());
        assert_eq!(space.keys(), vec!["long".to_string()]);
    }

    #[test]
    fn test_recreate_after_expiry_starts_at_version_one() {
        let space = space();

        space
            .set("key", Bytes::from("v1"), Some(now_millis() + 30))
            .unwrap();
        let overwrite = space
            .set("key", Bytes::from("v2"), Some(now_millis() + 30))
            .unwrap();
        assert_eq!(overwrite.version, 2);

        thread::sleep(Duration::from_millis(60));

        // Expiration is a full delete, not a gap in the counter.
        let recreated = space.set("key", Bytes::from("v3"), None).unwrap();
        assert_eq!(recreated.version, 1);
    }

    #[test]
    fn test_overwrite_replaces_expiration() {
        let space = space();

        space
            .set("key", Bytes::from("v1"), Some(now_millis() + 50))
            .unwrap();
        let meta = space.set("key", Bytes::from("v2"), None).unwrap();
        assert_eq!(meta.expired_at, None);

        thread::sleep(Duration::from_millis(80));

        // The overwrite cleared the expiration, so the entry survives.
        assert_eq!(space.get("key").unwrap().version, 2);
    }

    #[test]
    fn test_created_at_never_after_modified_at() {
        let space = space();

        space.set("key", Bytes::from("v1"), None).unwrap();
        thread::sleep(Duration::from_millis(5));
        let meta = space.set("key", Bytes::from("v2"), None).unwrap();

        assert!(meta.created_at <= meta.modified_at);
    }

    #[test]
    fn test_sweep_expired() {
        let space = space();

        space
            .set("a", Bytes::from("v"), Some(now_millis() + 10))
            .unwrap();
        space
            .set("b", Bytes::from("v"), Some(now_millis() + 10))
            .unwrap();
        space.set("c", Bytes::from("v"), None).unwrap();

        thread::sleep(Duration::from_millis(40));

        assert_eq!(space.len(), 3); // Physically still present
        let removed = space.sweep_expired();
        assert_eq!(removed, 2);
        assert_eq!(space.len(), 1);
        assert!(space.get("c").is_some());
    }

    #[test]
    fn test_concurrent_sets_observe_distinct_versions() {
        let space = Arc::new(space());
        let threads = 8;
        let mut handles = Vec::new();

        for _ in 0..threads {
            let space = Arc::clone(&space);
            handles.push(thread::spawn(move || {
                space.set("contended", Bytes::from("v"), None).unwrap().version
            }));
        }

        let mut versions: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        versions.sort_unstable();

        // Every writer succeeds with a distinct version in 1..=N.
        assert_eq!(versions, (1..=threads as u64).collect::<Vec<_>>());
    }

    #[test]
    fn test_concurrent_access_across_keys() {
        let space = Arc::new(Space::new(16));
        let mut handles = Vec::new();

        for i in 0..10 {
            let space = Arc::clone(&space);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let key = format!("key-{}-{}", i, j);
                    space.set(&key, Bytes::from("value"), None).unwrap();
                    assert!(space.get(&key).is_some());
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(space.keys().len(), 1000);
    }

    #[test]
    fn test_empty_value_is_present() {
        let space = space();

        space.set("empty", Bytes::new(), None).unwrap();
        let entry = space.get("empty").unwrap();
        assert!(entry.value.is_empty());
        assert_eq!(entry.version, 1);
    }
}
