//! Cross-region movement rules
//!
//! Admission never displaces an active entry. A dormant entry moves up when it
//! is accessed and either the active region has a free slot, or the count it
//! had before this access strictly exceeds the coldest active entry's count,
//! in which case the two swap tiers. Both keep their counters.

use serde::{Deserialize, Serialize};
use std::hash::Hash;

use super::region::{ActiveRegion, DormantRegion};
use super::types::Region;

/// How dormant entries may return to the active region
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromotionMode {
    /// Fill vacancies and swap with colder active entries
    #[default]
    Frequency,
    /// Pure overflow: dormant entries stay dormant
    Disabled,
}

/// Result of a promotion check on a dormant entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Promotion {
    /// Entry stays dormant
    Stayed,
    /// Entry took a free active slot
    FilledVacancy,
    /// Entry swapped places with the coldest active entry
    Swapped,
}

impl Promotion {
    pub fn promoted(&self) -> bool {
        !matches!(self, Self::Stayed)
    }
}

/// Applies admission and promotion rules to a pair of regions
#[derive(Debug, Clone, Copy, Default)]
pub struct PromotionPolicy {
    mode: PromotionMode,
}

impl PromotionPolicy {
    pub fn new(mode: PromotionMode) -> Self {
        Self { mode }
    }

    /// Region a newly added key is admitted into
    pub fn admission_region<K, V>(&self, active: &ActiveRegion<K, V>) -> Region
    where
        K: Hash + Eq + Clone,
    {
        if active.is_full() {
            Region::Dormant
        } else {
            Region::Active
        }
    }

    /// Promotion check for `key`, already counted in the dormant region.
    ///
    /// A fresh overflow entry read once (count 1, previously 0) does not
    /// displace an untouched active entry; it has to be read again.
    ///
    /// Any move happens entirely within this call, so callers holding the
    /// state lock never expose a key in both regions or in neither.
    pub fn apply<K, V>(
        &self,
        key: &K,
        active: &mut ActiveRegion<K, V>,
        dormant: &mut DormantRegion<K, V>,
    ) -> Promotion
    where
        K: Hash + Eq + Clone,
    {
        if self.mode == PromotionMode::Disabled {
            return Promotion::Stayed;
        }

        let prior = match dormant.peek(key) {
            Some(entry) => entry.frequency.saturating_sub(1),
            None => return Promotion::Stayed,
        };

        if !active.is_full() {
            if let Some(entry) = dormant.remove(key) {
                let inserted = active.insert_entry(key.clone(), entry);
                debug_assert!(inserted, "vacant active region rejected entry");
                return Promotion::FilledVacancy;
            }
            return Promotion::Stayed;
        }

        let coldest = match active.coldest() {
            Some((cold_key, cold_frequency)) if prior > cold_frequency => cold_key.clone(),
            _ => return Promotion::Stayed,
        };

        let Some(cold_entry) = active.remove(&coldest) else {
            return Promotion::Stayed;
        };
        let Some(entry) = dormant.remove(key) else {
            active.insert_entry(coldest, cold_entry);
            return Promotion::Stayed;
        };

        let inserted = active.insert_entry(key.clone(), entry);
        debug_assert!(inserted, "active slot freed by demotion was not reusable");
        dormant.insert_entry(coldest, cold_entry);

        Promotion::Swapped
    }
}
