//! Background Expiration Reaper
//!
//! Lazy expiry (checking on access) keeps reads correct, but an entry
//! that expires and is never read again would stay in memory forever.
//! The reaper is a background task that periodically sweeps every space
//! and physically removes expired entries.
//!
//! Correctness never depends on the sweep: reads apply lazy expiry on
//! their own. The sweep only bounds the storage footprint.
//!
//! ## Design
//!
//! The reaper runs as a Tokio task and:
//! 1. Sleeps for a configurable interval
//! 2. Wakes up and takes a snapshot of the live spaces
//! 3. Sweeps each space, one shard lock at a time
//! 4. Optionally garbage-collects spaces that became empty
//!
//! Sweep decisions use the same per-key atomic primitive as `delete`:
//! a sweep racing a concurrent `set` or `delete` can neither resurrect
//! an entry nor double-remove a replacement.
//!
//! ## Adaptive Frequency
//!
//! If many entries are expiring, the reaper runs more frequently.
//! If few are expiring, it backs off to save CPU.

use crate::storage::registry::SpaceRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Configuration for the expiration reaper.
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// Base interval between sweeps (default: 100ms)
    pub base_interval: Duration,

    /// Minimum interval between sweeps (default: 10ms)
    pub min_interval: Duration,

    /// Maximum interval between sweeps (default: 1s)
    pub max_interval: Duration,

    /// If this fraction of scanned entries are expired, speed up sweeping
    pub speedup_threshold: f64,

    /// If this fraction of scanned entries are expired, slow down sweeping
    pub slowdown_threshold: f64,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(100),
            min_interval: Duration::from_millis(10),
            max_interval: Duration::from_secs(1),
            speedup_threshold: 0.25,  // Speed up if >25% of entries are expired
            slowdown_threshold: 0.01, // Slow down if <1% of entries are expired
        }
    }
}

/// A handle to the running reaper.
///
/// When this handle is dropped, the reaper task stops.
#[derive(Debug)]
pub struct Reaper {
    shutdown_tx: watch::Sender<bool>,
}

impl Reaper {
    /// Starts the reaper as a background task over the given registry.
    ///
    /// Returns a handle that can be used to stop the reaper; it also
    /// stops automatically when the handle is dropped.
    pub fn start(registry: Arc<SpaceRegistry>, config: ReaperConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(reaper_loop(registry, config, shutdown_rx));

        info!("background expiration reaper started");

        Self { shutdown_tx }
    }

    /// Stops the reaper.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        info!("background expiration reaper stopped");
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main reaper loop.
async fn reaper_loop(
    registry: Arc<SpaceRegistry>,
    config: ReaperConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut current_interval = config.base_interval;
    let drop_empty_spaces = !registry.config().retain_empty_spaces;

    loop {
        // Wait for the interval or shutdown signal
        tokio::select! {
            _ = tokio::time::sleep(current_interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("expiration reaper received shutdown signal");
                    return;
                }
            }
        }

        // Sweep every live space. The snapshot keeps the registry lock
        // out of the scan entirely.
        let mut scanned = 0usize;
        let mut removed = 0u64;
        for (name, space) in registry.snapshot() {
            scanned += space.len();
            let swept = space.sweep_expired();
            if swept > 0 {
                debug!(
                    space = name.as_str(),
                    removed = swept,
                    remaining = space.len(),
                    "expired entries reaped"
                );
            }
            removed += swept;
        }

        if drop_empty_spaces {
            let collected = registry.remove_empty_spaces();
            if collected > 0 {
                debug!(spaces = collected, "empty spaces garbage-collected");
            }
        }

        // Adjust interval based on the expiry rate
        if scanned > 0 {
            let expiry_rate = removed as f64 / scanned as f64;

            if expiry_rate > config.speedup_threshold {
                // Many entries expiring - speed up
                current_interval = (current_interval / 2).max(config.min_interval);
                debug!(
                    removed = removed,
                    rate = %format!("{:.2}%", expiry_rate * 100.0),
                    new_interval_ms = current_interval.as_millis(),
                    "high expiry rate, speeding up reaper"
                );
            } else if expiry_rate < config.slowdown_threshold && removed == 0 {
                // Few entries expiring - slow down
                current_interval = (current_interval * 2).min(config.max_interval);
                trace!(
                    new_interval_ms = current_interval.as_millis(),
                    "low expiry rate, slowing down reaper"
                );
            }
        }
    }
}

/// Starts the reaper with default configuration.
///
/// Convenience function for simple use cases.
pub fn start_reaper(registry: Arc<SpaceRegistry>) -> Reaper {
    Reaper::start(registry, ReaperConfig::default())
}
