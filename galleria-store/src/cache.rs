//! Result cache with TTL expiry and LRU eviction.
//!
//! Entries are keyed by the identity cache key. Age is measured from
//! insertion; recency from the last successful lookup. Bookkeeping happens
//! synchronously inside `get`/`set`, so the cache is a plain value owned by
//! the orchestrator.

use chrono::{DateTime, Utc};
use galleria_core::{Clock, ExtractionResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Default capacity.
pub const DEFAULT_MAX_ENTRIES: usize = 50;

/// Default time-to-live.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

// ============================================================================
// Configuration
// ============================================================================

/// Capacity and time-to-live of a [`ResultCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries.
    pub max_entries: usize,
    /// Maximum entry age.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl: DEFAULT_TTL,
        }
    }
}

impl CacheConfig {
    /// Creates a config.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self { max_entries, ttl }
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Counters of a [`ResultCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing usable.
    pub misses: u64,
    /// Entries evicted to make room.
    pub lru_evictions: u64,
    /// Entries dropped for exceeding the TTL.
    pub ttl_evictions: u64,
    /// Sum of both eviction kinds.
    pub evictions: u64,
    /// Current number of entries.
    pub size: usize,
    /// Configured capacity.
    pub capacity: usize,
    /// `hits / (hits + misses)`, 0 without lookups.
    pub hit_ratio: f64,
}

// ============================================================================
// Cache
// ============================================================================

#[derive(Debug, Clone)]
struct CacheEntry {
    result: ExtractionResult,
    inserted_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    // Monotonic recency stamp; breaks ties between equal timestamps.
    touched: u64,
}

/// Bounded, expiring store of successful extraction results.
#[derive(Debug)]
pub struct ResultCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    entries: HashMap<String, CacheEntry>,
    tick: u64,
    hits: u64,
    misses: u64,
    lru_evictions: u64,
    ttl_evictions: u64,
}

impl ResultCache {
    /// Creates an empty cache.
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            entries: HashMap::new(),
            tick: 0,
            hits: 0,
            misses: 0,
            lru_evictions: 0,
            ttl_evictions: 0,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> CacheConfig {
        self.config
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        // A clock running backwards never expires an entry.
        (now - entry.inserted_at)
            .to_std()
            .is_ok_and(|age| age > self.config.ttl)
    }

    /// Looks up `key`.
    ///
    /// A hit refreshes recency. An expired entry is removed and counted as a
    /// miss and a TTL eviction.
    pub fn get(&mut self, key: &str) -> Option<ExtractionResult> {
        let now = self.clock.now();

        let expired = match self.entries.get(key) {
            None => {
                self.misses += 1;
                trace!(key, "Cache miss");
                return None;
            }
            Some(entry) => self.is_expired(entry, now),
        };

        if expired {
            self.entries.remove(key);
            self.misses += 1;
            self.ttl_evictions += 1;
            debug!(key, "Cache entry expired");
            return None;
        }

        let tick = self.next_tick();
        let entry = self.entries.get_mut(key)?;
        entry.last_accessed_at = now;
        entry.touched = tick;
        self.hits += 1;
        trace!(key, "Cache hit");
        Some(entry.result.clone())
    }

    /// Stores `result` under `key`.
    ///
    /// An existing key is replaced in place. Otherwise, at capacity, the
    /// least recently used entry is evicted before inserting.
    pub fn set(&mut self, key: impl Into<String>, result: ExtractionResult) {
        if self.config.max_entries == 0 {
            return;
        }
        let key = key.into();
        let now = self.clock.now();
        let touched = self.next_tick();

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.result = result;
            entry.inserted_at = now;
            entry.last_accessed_at = now;
            entry.touched = touched;
            return;
        }

        if self.entries.len() >= self.config.max_entries {
            self.evict_lru();
        }

        self.entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: now,
                last_accessed_at: now,
                touched,
            },
        );
    }

    fn evict_lru(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| (entry.last_accessed_at, entry.touched))
            .map(|(key, _)| key.clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
            self.lru_evictions += 1;
            debug!(key = %key, "Evicted least recently used entry");
        }
    }

    /// Returns true if `key` holds an unexpired entry. Counters are untouched.
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.entries
            .get(key)
            .is_some_and(|entry| !self.is_expired(entry, now))
    }

    /// Removes `key`; returns true if it was present.
    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drops every expired entry, counting TTL evictions.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        let ttl = self.config.ttl;
        self.entries.retain(|_, entry| {
            !(now - entry.inserted_at)
                .to_std()
                .is_ok_and(|age| age > ttl)
        });
        let purged = before - self.entries.len();
        self.ttl_evictions += purged as u64;
        purged
    }

    /// Removes every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the counters.
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let lookups = self.hits + self.misses;
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            lru_evictions: self.lru_evictions,
            ttl_evictions: self.ttl_evictions,
            evictions: self.lru_evictions + self.ttl_evictions,
            size: self.entries.len(),
            capacity: self.config.max_entries,
            hit_ratio: if lookups == 0 {
                0.0
            } else {
                self.hits as f64 / lookups as f64
            },
        }
    }
}
