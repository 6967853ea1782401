// crates/rule-orchestrator-core/src/runtime/cache.rs
// ============================================================================
// Module: Composition Cache
// Description: Bounded LRU cache with per-entry TTL.
// Purpose: Memoize composed rules keyed by path and snapshot hash.
// Dependencies: crate::core::time, serde
// ============================================================================

//! ## Overview
//! [`RuleCache`] keeps at most `capacity` entries. Every entry carries its own
//! TTL measured against an injected [`Clock`](crate::core::time::Clock), so
//! expiry is deterministic under test. Least-recently-used order is tracked
//! with a monotonically increasing access tick.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::core::time::SharedClock;
use crate::core::time::duration_millis;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default maximum number of entries.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Default entry lifetime.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

// ============================================================================
// SECTION: Types
// ============================================================================

/// One cached value.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    /// Cached payload.
    value: V,
    /// Insertion time (unix milliseconds).
    inserted_ms: i64,
    /// Lifetime in milliseconds.
    ttl_ms: i64,
    /// Number of reads plus the initial insert.
    access_count: u64,
    /// Position in LRU order.
    tick: u64,
}

impl<V> CacheEntry<V> {
    /// Returns true once the entry has outlived its TTL.
    const fn is_expired(&self, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.inserted_ms) > self.ttl_ms
    }
}

/// Cache statistics snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Entries currently stored.
    pub size: usize,
    /// Maximum entries.
    pub capacity: usize,
    /// Sum of access counts over stored entries.
    pub total_accesses: u64,
    /// Successful lookups.
    pub hits: u64,
    /// Failed lookups (absent or expired).
    pub misses: u64,
    /// Entries removed to make room.
    pub evictions: u64,
    /// Stored entries already past their TTL.
    pub expired: usize,
    /// `hits / (hits + misses)`, or 0 before any lookup.
    pub hit_rate: f64,
}

/// Bounded LRU cache with TTL expiry.
///
/// # Invariants
/// - `entries.len() <= capacity`.
/// - `order` holds exactly one tick per stored key; the smallest tick is the
///   least recently used entry.
pub struct RuleCache<V> {
    /// Maximum entries.
    capacity: usize,
    /// Lifetime used when `put` receives no TTL.
    default_ttl: Duration,
    /// Time source.
    clock: SharedClock,
    /// Stored entries by key.
    entries: BTreeMap<String, CacheEntry<V>>,
    /// Access tick to key.
    order: BTreeMap<u64, String>,
    /// Next access tick.
    next_tick: u64,
    /// Successful lookups.
    hits: u64,
    /// Failed lookups.
    misses: u64,
    /// Capacity evictions.
    evictions: u64,
}

impl<V: Clone> RuleCache<V> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(capacity: usize, default_ttl: Duration, clock: SharedClock) -> Self {
        Self {
            capacity,
            default_ttl,
            clock,
            entries: BTreeMap::new(),
            order: BTreeMap::new(),
            next_tick: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Returns the configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of stored entries (expired ones included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up a key. Expired entries are removed and reported as misses.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now_millis();
        let expired = match self.entries.get(key) {
            None => {
                self.misses += 1;
                return None;
            }
            Some(entry) => entry.is_expired(now),
        };
        if expired {
            self.invalidate(key);
            self.misses += 1;
            return None;
        }
        let tick = self.bump_tick();
        let entry = self.entries.get_mut(key)?;
        self.order.remove(&entry.tick);
        entry.tick = tick;
        entry.access_count += 1;
        self.order.insert(tick, key.to_string());
        self.hits += 1;
        Some(entry.value.clone())
    }

    /// Stores a value, evicting the least recently used entry when full.
    pub fn put(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        if self.capacity == 0 {
            return;
        }
        let key = key.into();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_lru();
        }
        self.invalidate(&key);
        let tick = self.bump_tick();
        let entry = CacheEntry {
            value,
            inserted_ms: self.clock.now_millis(),
            ttl_ms: duration_millis(ttl.unwrap_or(self.default_ttl)),
            access_count: 1,
            tick,
        };
        self.order.insert(tick, key.clone());
        self.entries.insert(key, entry);
    }

    /// Removes a key if present.
    pub fn invalidate(&mut self, key: &str) {
        if let Some(entry) = self.entries.remove(key) {
            self.order.remove(&entry.tick);
        }
    }

    /// Removes every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Returns a statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now_millis();
        let lookups = self.hits + self.misses;
        #[allow(clippy::cast_precision_loss, reason = "Counters stay far below 2^52.")]
        let hit_rate = if lookups == 0 { 0.0 } else { self.hits as f64 / lookups as f64 };
        CacheStats {
            size: self.entries.len(),
            capacity: self.capacity,
            total_accesses: self.entries.values().map(|entry| entry.access_count).sum(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            expired: self.entries.values().filter(|entry| entry.is_expired(now)).count(),
            hit_rate,
        }
    }

    /// Returns the next access tick.
    const fn bump_tick(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    /// Removes the least recently used entry.
    fn evict_lru(&mut self) {
        if let Some((_, key)) = self.order.pop_first() {
            self.entries.remove(&key);
            self.evictions += 1;
        }
    }
}
