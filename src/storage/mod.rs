//! Storage Engine Module
//!
//! The core of spacekv: namespaced, versioned key-value storage with
//! absolute-time expiration.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       SpaceRegistry                          │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐        │
//! │  │ Space "a"    │  │ Space "b"    │  │ Space "c"    │        │
//! │  │ shard shard  │  │ shard shard  │  │ shard shard  │        │
//! │  │ RwLock maps  │  │ RwLock maps  │  │ RwLock maps  │        │
//! │  └──────────────┘  └──────────────┘  └──────────────┘        │
//! └──────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │
//!              ┌─────────────┴─────────────┐
//!              │          Reaper           │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Isolated Spaces**: case-sensitive namespaces, created lazily on
//!   first write, deleted with atomic cascade
//! - **Versioned Entries**: per-key monotonic counter, +1 on every
//!   overwrite, reset only by delete or expiry
//! - **Lazy Expiry**: expired entries behave as absent on every read
//! - **Active Expiry**: the background reaper physically reclaims
//!   entries that are never read again

pub mod reaper;
pub mod registry;
pub mod space;

// Re-export commonly used types
pub use reaper::{start_reaper, Reaper, ReaperConfig};
pub use registry::{SpaceRegistry, StoreConfig};
pub use space::{now_millis, Entry, EpochMillis, Space, StorageError, ValueMeta};
