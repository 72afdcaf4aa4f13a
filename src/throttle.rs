//! Burst suppression ("thrashing" limiting) with a TTL counter store.
//!
//! Repeated near-identical failures - a hot loop raising the same
//! exception, a dependency outage hammering every request - would flood
//! the collector. The [`ThrashingLimiter`] counts occurrences per
//! `(class_name, fingerprint)` key in a shared [`CounterStore`] and
//! suppresses everything past the configured limit within the window.
//!
//! # Architecture
//!
//! - **[`CounterStore`] trait**: the shared, possibly cross-process
//!   counter backend with `add`/`incr` and TTL semantics. Atomicity is
//!   the store's concern; the limiter never locks.
//! - **[`MemoryCounterStore`]**: default in-process backend on a moka
//!   sync cache with per-entry TTL expiration and lock-free counters.
//!
//! Multiple producers may race to create or increment the same key. The
//! design tolerates undercounting: when an increment loses against a
//! concurrent expiry, the occurrence counts as zero and passes.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::sync::Cache;
use moka::Expiry;

use crate::config::ThrashingConfig;
use crate::error::CounterError;

/// Default maximum number of tracked keys, bounding memory.
const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// Key prefix for counter entries.
const KEY_PREFIX: &str = "faultline";

/// Decision for a single occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Dispatch the event.
    Allow,
    /// Suppress the event (normal outcome, not an error).
    Suppress,
}

/// Shared counter store with TTL semantics.
///
/// `add` must be atomic create-if-absent; `incr` must be atomic and fail
/// when the key does not exist (for example because it expired between
/// the caller's `add` and `incr`). Implementations are free to expire
/// entries at any time; the limiter tolerates the resulting races.
pub trait CounterStore: Send + Sync {
    /// Create `key` with the given initial count and TTL.
    ///
    /// Returns `true` when the key was created, `false` when it already
    /// existed (in which case the stored count and TTL are untouched).
    fn add(&self, key: &str, initial: u32, ttl: Duration) -> bool;

    /// Atomically increment `key`, returning the new count.
    ///
    /// # Errors
    /// Fails with [`CounterError::Missing`] when the key is absent.
    fn incr(&self, key: &str) -> Result<u32, CounterError>;
}

#[derive(Clone)]
struct CounterEntry {
    count: Arc<AtomicU32>,
    ttl: Duration,
}

/// Expire each entry after its own TTL.
struct PerEntryTtl;

impl Expiry<String, CounterEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CounterEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process counter store on a moka sync cache.
///
/// Entries carry their TTL and expire automatically; counters are
/// `Arc<AtomicU32>` so increments are lock-free.
pub struct MemoryCounterStore {
    cache: Cache<String, CounterEntry>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }

    /// Create a store with a custom key capacity (for testing).
    pub fn with_capacity(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }

    /// Flush moka's pending maintenance work (test helper: expiry in the
    /// sync cache is processed lazily).
    #[cfg(test)]
    pub(crate) fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterStore for MemoryCounterStore {
    fn add(&self, key: &str, initial: u32, ttl: Duration) -> bool {
        let entry = self.cache.entry(key.to_string()).or_insert_with(|| CounterEntry {
            count: Arc::new(AtomicU32::new(initial)),
            ttl,
        });
        entry.is_fresh()
    }

    fn incr(&self, key: &str) -> Result<u32, CounterError> {
        match self.cache.get(key) {
            Some(entry) => Ok(entry.count.fetch_add(1, Ordering::SeqCst) + 1),
            None => Err(CounterError::Missing(key.to_string())),
        }
    }
}

impl std::fmt::Debug for MemoryCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCounterStore")
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

/// Per-key burst suppression gate.
///
/// State machine per `(class_name, fingerprint)` key: absent →
/// tracked(count=1) on first occurrence (Allow); tracked increments on
/// each subsequent occurrence, allowing while count ≤ limit and
/// suppressing past it; entries expire after the window with no explicit
/// deletion. Exactly one decision per call - the limiter never retries
/// internally.
pub struct ThrashingLimiter {
    store: Arc<dyn CounterStore>,
    config: Option<ThrashingConfig>,
}

impl ThrashingLimiter {
    /// Create a limiter from configuration.
    ///
    /// A missing config, or one with a zero window or limit, disables
    /// the limiter: every occurrence is allowed.
    pub fn new(config: Option<ThrashingConfig>, store: Arc<dyn CounterStore>) -> Self {
        let config = config.filter(ThrashingConfig::is_enabled);
        Self { store, config }
    }

    /// Decide whether this occurrence may be dispatched.
    pub fn check(&self, class_name: Option<&str>, fingerprint: &str) -> ThrottleDecision {
        let Some(config) = self.config else {
            return ThrottleDecision::Allow;
        };

        let key = format!(
            "{}:{}:{}",
            KEY_PREFIX,
            class_name.unwrap_or("-"),
            fingerprint
        );

        if self.store.add(&key, 1, config.window) {
            // First occurrence in this window.
            return ThrottleDecision::Allow;
        }

        let count = match self.store.incr(&key) {
            Ok(count) => count,
            Err(e) => {
                // The key expired between add and incr. Assume we are not
                // thrashing yet; if we are, a later occurrence will land
                // its increment.
                tracing::debug!(key = %key, error = %e, "Counter increment failed, assuming count 0");
                0
            }
        };

        if count > config.limit {
            tracing::debug!(
                key = %key,
                count = count,
                limit = config.limit,
                "Event suppressed by thrashing limiter"
            );
            metrics::counter!(
                "faultline_events_suppressed_total",
                "class_name" => class_name.unwrap_or("-").to_string()
            )
            .increment(1);
            ThrottleDecision::Suppress
        } else {
            ThrottleDecision::Allow
        }
    }
}

impl std::fmt::Debug for ThrashingLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrashingLimiter")
            .field("config", &self.config)
            .finish()
    }
}
