use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::{CacheError, Result};
use super::promotion::PromotionMode;

/// Stored value with its access counter.
///
/// The counter survives moves between regions; only `Remove`/`Clear` drop it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<V> {
    /// Cached value
    pub value: V,
    /// Number of successful lookups/updates since the entry was added
    pub frequency: u64,
}

impl<V> Entry<V> {
    /// Create a fresh entry with frequency 0
    pub fn new(value: V) -> Self {
        Self {
            value,
            frequency: 0,
        }
    }

    /// Create an entry that keeps an existing access counter
    pub fn with_frequency(value: V, frequency: u64) -> Self {
        Self { value, frequency }
    }
}

/// Storage tier holding a key
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    /// Bounded fast-path tier
    Active,
    /// Unbounded overflow tier
    Dormant,
}

/// Configuration for a cache engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries held by the active region
    pub active_capacity: usize,
    /// Cleaner tick interval in milliseconds
    pub cleaner_interval_ms: u64,
    /// Whether dormant entries can move back into the active region
    #[serde(default)]
    pub promotion: PromotionMode,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            active_capacity: 1024,
            cleaner_interval_ms: 1000,
            promotion: PromotionMode::Frequency,
        }
    }
}

impl CacheConfig {
    /// Build a config from a capacity and a cleaner interval.
    ///
    /// The interval is rounded up to whole milliseconds, so any non-zero
    /// duration stays valid.
    pub fn new(active_capacity: usize, cleaner_interval: Duration) -> Self {
        let millis = cleaner_interval.as_nanos().div_ceil(1_000_000);
        Self {
            active_capacity,
            cleaner_interval_ms: u64::try_from(millis).unwrap_or(u64::MAX),
            promotion: PromotionMode::default(),
        }
    }

    /// Reject non-positive capacity or interval
    pub fn validate(&self) -> Result<()> {
        if self.active_capacity == 0 {
            return Err(CacheError::InvalidCapacity(self.active_capacity));
        }
        if self.cleaner_interval_ms == 0 {
            return Err(CacheError::InvalidInterval(self.cleaner_interval_ms));
        }
        Ok(())
    }

    /// Cleaner interval as a `Duration`
    pub fn cleaner_interval(&self) -> Duration {
        Duration::from_millis(self.cleaner_interval_ms)
    }
}

/// Operation counters for a cache engine
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups that found the key
    pub hits: u64,
    /// Lookups that did not find the key
    pub misses: u64,
    /// Adds admitted into the active region
    pub inserts: u64,
    /// Adds that overflowed into the dormant region
    pub overflow_inserts: u64,
    /// Successful updates
    pub updates: u64,
    /// Successful removals
    pub removals: u64,
    /// Dormant entries moved into the active region
    pub promotions: u64,
    /// Active entries moved into the dormant region
    pub demotions: u64,
    /// Calls to `clear`
    pub clears: u64,
}

impl CacheStats {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub(crate) fn record_lookup(&mut self, found: bool) {
        if found {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }
}
