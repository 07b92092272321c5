use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::cleaner::{Cleaner, CleanerSource};
use super::error::{CacheError, Result};
use super::events::{DispatchStats, EmptyCacheEvent, EmptySource, EventDispatcher, SubscriberId};
use super::promotion::{Promotion, PromotionPolicy};
use super::region::{ActiveRegion, DormantRegion};
use super::types::{CacheConfig, CacheStats, Region};

/// Both regions plus counters, guarded by a single lock so a promotion swap
/// is never observed half-done.
struct State<K: Hash + Eq + Clone, V> {
    active: ActiveRegion<K, V>,
    dormant: DormantRegion<K, V>,
    stats: CacheStats,
    disposed: bool,
}

impl<K: Hash + Eq + Clone, V> State<K, V> {
    fn total(&self) -> usize {
        self.active.len() + self.dormant.len()
    }

    fn promote(&mut self, policy: &PromotionPolicy, key: &K) -> Promotion {
        let outcome = policy.apply(key, &mut self.active, &mut self.dormant);
        match &outcome {
            Promotion::Stayed => {}
            Promotion::FilledVacancy => {
                self.stats.promotions += 1;
                debug!("Dormant entry promoted into vacant active slot");
            }
            Promotion::Swapped => {
                self.stats.promotions += 1;
                self.stats.demotions += 1;
                debug!("Dormant entry swapped with coldest active entry");
            }
        }
        outcome
    }
}

struct Shared<K: Hash + Eq + Clone, V> {
    state: RwLock<State<K, V>>,
    policy: PromotionPolicy,
    previous_count: AtomicUsize,
    events: EventDispatcher,
}

impl<K, V> CleanerSource for Shared<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn snapshot_total(&self) -> Option<usize> {
        let state = self.state.read();
        if state.disposed {
            None
        } else {
            Some(state.total())
        }
    }

    fn publish_total(&self, total: usize) {
        self.previous_count.store(total, Ordering::Release);
    }

    fn events(&self) -> &EventDispatcher {
        &self.events
    }
}

/// Two-tier LFU cache.
///
/// New keys land in the bounded active region while it has room and overflow
/// into the unbounded dormant region afterwards. Accessing a dormant key bumps
/// its counter and may move it back into the active region (see
/// [`PromotionPolicy`]). A background cleaner refreshes
/// [`previous_count`](Self::previous_count) and notifies subscribers while the
/// cache is empty.
///
/// Construction needs a tokio runtime. Every operation returns
/// [`CacheError::Disposed`] once [`dispose`](Self::dispose) has run.
///
/// ```rust,ignore
/// let cache = NimbusCache::with_capacity(2, Duration::from_secs(1))?;
/// cache.add("a", 1)?;
/// cache.add("b", 2)?;
/// cache.add("c", 3)?; // overflows into the dormant region
///
/// assert_eq!(cache.active_count()?, 2);
/// assert!(!cache.active_lookup(&"c")?);
/// assert!(cache.lookup(&"c")?);
/// ```
pub struct NimbusCache<K: Hash + Eq + Clone, V> {
    shared: Arc<Shared<K, V>>,
    cleaner: Mutex<Option<Cleaner>>,
}

impl<K, V> NimbusCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Create a cache and start its cleaner on the current tokio runtime
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "Initializing Nimbus cache with active_capacity={}, cleaner_interval={}ms, promotion={:?}",
            config.active_capacity, config.cleaner_interval_ms, config.promotion
        );

        let shared = Arc::new(Shared {
            state: RwLock::new(State {
                active: ActiveRegion::new(config.active_capacity),
                dormant: DormantRegion::new(),
                stats: CacheStats::default(),
                disposed: false,
            }),
            policy: PromotionPolicy::new(config.promotion),
            previous_count: AtomicUsize::new(0),
            events: EventDispatcher::new(),
        });

        let cleaner = Cleaner::spawn(Arc::clone(&shared), config.cleaner_interval())?;

        Ok(Self {
            shared,
            cleaner: Mutex::new(Some(cleaner)),
        })
    }

    /// Shorthand for [`new`](Self::new) with default promotion
    pub fn with_capacity(active_capacity: usize, cleaner_interval: Duration) -> Result<Self> {
        Self::new(CacheConfig::new(active_capacity, cleaner_interval))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State<K, V>>> {
        let state = self.shared.state.read();
        if state.disposed {
            return Err(CacheError::Disposed);
        }
        Ok(state)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State<K, V>>> {
        let state = self.shared.state.write();
        if state.disposed {
            return Err(CacheError::Disposed);
        }
        Ok(state)
    }

    /// Add a new key. Goes to the active region while it has room, otherwise
    /// to the dormant region. Existing keys are left untouched.
    pub fn add(&self, key: K, value: V) -> Result<()> {
        let mut state = self.write()?;

        if state.active.contains(&key) || state.dormant.contains(&key) {
            debug!("ADD ignored, key already cached");
            return Ok(());
        }

        match self.shared.policy.admission_region(&state.active) {
            Region::Active => {
                state.active.insert(key, value);
                state.stats.inserts += 1;
            }
            Region::Dormant => {
                state.dormant.insert(key, value);
                state.stats.overflow_inserts += 1;
                debug!(
                    "Active region full ({}), entry admitted to dormant region",
                    state.active.capacity()
                );
            }
        }

        Ok(())
    }

    /// Overwrite the value of an existing key in either region.
    ///
    /// Counts as an access. Returns false if the key is not cached.
    pub fn update(&self, key: &K, value: V) -> Result<bool> {
        let mut state = self.write()?;

        let updated = if state.active.contains(key) {
            state.active.update_value(key, value)
        } else if state.dormant.update_value(key, value) {
            state.promote(&self.shared.policy, key);
            true
        } else {
            false
        };

        if updated {
            state.stats.updates += 1;
        }
        Ok(updated)
    }

    /// Whether the key is in the active region; counts as an access there
    pub fn active_lookup(&self, key: &K) -> Result<bool> {
        let mut state = self.write()?;
        let found = state.active.lookup(key).is_some();
        state.stats.record_lookup(found);
        Ok(found)
    }

    /// Whether the key is cached in either region; counts as an access and
    /// may promote a dormant entry.
    pub fn lookup(&self, key: &K) -> Result<bool> {
        let mut state = self.write()?;
        let found = Self::locate(&mut state, &self.shared.policy, key).is_some();
        state.stats.record_lookup(found);
        Ok(found)
    }

    /// Remove a key from the active region only
    pub fn active_remove(&self, key: &K) -> Result<Option<V>> {
        let (removed, emptied) = {
            let mut state = self.write()?;
            let removed = state.active.remove(key).map(|entry| entry.value);
            Self::finish_removal(&mut state, removed)
        };

        if emptied {
            self.shared.events.notify(EmptySource::Removal);
        }
        Ok(removed)
    }

    /// Remove a key from whichever region holds it. Subscribers are notified
    /// before returning if this emptied the cache.
    pub fn remove(&self, key: &K) -> Result<Option<V>> {
        let (removed, emptied) = {
            let mut state = self.write()?;
            let removed = match state.active.remove(key) {
                Some(entry) => Some(entry.value),
                None => state.dormant.remove(key).map(|entry| entry.value),
            };
            Self::finish_removal(&mut state, removed)
        };

        if emptied {
            self.shared.events.notify(EmptySource::Removal);
        }
        Ok(removed)
    }

    /// Empty both regions and notify subscribers once
    pub fn clear(&self) -> Result<()> {
        {
            let mut state = self.write()?;
            let total = state.total();
            state.active.clear();
            state.dormant.clear();
            state.stats.clears += 1;
            debug!("Cache cleared ({} entries dropped)", total);
        }

        self.shared.events.notify(EmptySource::Clear);
        Ok(())
    }

    /// Entries in the active region
    pub fn active_count(&self) -> Result<usize> {
        Ok(self.read()?.active.len())
    }

    /// Entries in the dormant region
    pub fn dormant_count(&self) -> Result<usize> {
        Ok(self.read()?.dormant.len())
    }

    /// Entries in both regions
    pub fn count(&self) -> Result<usize> {
        Ok(self.read()?.total())
    }

    /// Total count as of the last cleaner tick
    pub fn previous_count(&self) -> Result<usize> {
        self.read()?;
        Ok(self.shared.previous_count.load(Ordering::Acquire))
    }

    /// Presence check that does not count as an access
    pub fn contains(&self, key: &K) -> Result<bool> {
        let state = self.read()?;
        Ok(state.active.contains(key) || state.dormant.contains(key))
    }

    /// Current access counter of a key, without touching it
    pub fn frequency(&self, key: &K) -> Result<Option<u64>> {
        let state = self.read()?;
        Ok(state
            .active
            .frequency(key)
            .or_else(|| state.dormant.peek(key).map(|entry| entry.frequency)))
    }

    /// Region currently holding a key, without touching it
    pub fn region_of(&self, key: &K) -> Result<Option<Region>> {
        let state = self.read()?;
        if state.active.contains(key) {
            Ok(Some(Region::Active))
        } else if state.dormant.contains(key) {
            Ok(Some(Region::Dormant))
        } else {
            Ok(None)
        }
    }

    pub fn capacity(&self) -> Result<usize> {
        Ok(self.read()?.active.capacity())
    }

    pub fn stats(&self) -> Result<CacheStats> {
        Ok(self.read()?.stats.clone())
    }

    pub fn dispatch_stats(&self) -> DispatchStats {
        self.shared.events.stats()
    }

    /// Register an emptiness handler
    pub fn subscribe<F>(&self, handler: F) -> Result<SubscriberId>
    where
        F: Fn(&EmptyCacheEvent) + Send + Sync + 'static,
    {
        self.read()?;
        Ok(self.shared.events.subscribe(handler))
    }

    pub fn unsubscribe(&self, id: &SubscriberId) -> Result<bool> {
        self.read()?;
        Ok(self.shared.events.unsubscribe(id))
    }

    pub fn subscriber_count(&self) -> Result<usize> {
        self.read()?;
        Ok(self.shared.events.len())
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.state.read().disposed
    }

    /// Stop the cleaner, waiting for an in-flight tick, then release all
    /// entries and subscribers. Calling it again is a no-op.
    ///
    /// Concurrent callers queue on the cleaner slot, so none of them returns
    /// before the whole teardown has finished.
    pub async fn dispose(&self) {
        let mut cleaner = self.cleaner.lock().await;
        if let Some(running) = cleaner.take() {
            running.stop().await;
        }

        {
            let mut state = self.shared.state.write();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.active.clear();
            state.dormant.clear();
        }

        self.shared.events.clear();
        self.shared.previous_count.store(0, Ordering::Release);
        drop(cleaner);
        info!("Nimbus cache disposed");
    }

    /// Counted access in either region, promoting from dormant if the policy
    /// allows. Returns the region that holds the key afterwards.
    fn locate(state: &mut State<K, V>, policy: &PromotionPolicy, key: &K) -> Option<Region> {
        if state.active.lookup(key).is_some() {
            return Some(Region::Active);
        }
        state.dormant.lookup(key)?;
        if state.promote(policy, key).promoted() {
            Some(Region::Active)
        } else {
            Some(Region::Dormant)
        }
    }

    fn finish_removal(state: &mut State<K, V>, removed: Option<V>) -> (Option<V>, bool) {
        match removed {
            Some(value) => {
                state.stats.removals += 1;
                let emptied = state.total() == 0;
                (Some(value), emptied)
            }
            None => (None, false),
        }
    }
}

impl<K, V> NimbusCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Value-returning [`lookup`](Self::lookup), with the same side effects
    pub fn get(&self, key: &K) -> Result<Option<V>> {
        let mut state = self.write()?;
        let value = match Self::locate(&mut state, &self.shared.policy, key) {
            Some(Region::Active) => state.active.peek(key).cloned(),
            Some(Region::Dormant) => state.dormant.peek(key).map(|entry| entry.value.clone()),
            None => None,
        };
        state.stats.record_lookup(value.is_some());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize) -> NimbusCache<&'static str, i32> {
        NimbusCache::with_capacity(capacity, Duration::from_secs(60)).unwrap()
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let zero_capacity = NimbusCache::<&str, i32>::with_capacity(0, Duration::from_secs(1));
        assert!(matches!(zero_capacity, Err(CacheError::InvalidCapacity(0))));

        let zero_interval = NimbusCache::<&str, i32>::with_capacity(4, Duration::ZERO);
        assert!(matches!(zero_interval, Err(CacheError::InvalidInterval(0))));
    }

    #[test]
    fn test_requires_runtime() {
        let result = NimbusCache::<&str, i32>::with_capacity(4, Duration::from_secs(1));
        assert!(matches!(result, Err(CacheError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_add_overflows_to_dormant() {
        let cache = cache(2);
        cache.add("a", 1).unwrap();
        cache.add("b", 2).unwrap();
        cache.add("c", 3).unwrap();

        assert_eq!(cache.active_count().unwrap(), 2);
        assert_eq!(cache.dormant_count().unwrap(), 1);
        assert_eq!(cache.region_of(&"c").unwrap(), Some(Region::Dormant));

        let stats = cache.stats().unwrap();
        assert_eq!(stats.inserts, 2);
        assert_eq!(stats.overflow_inserts, 1);
    }

    #[tokio::test]
    async fn test_update_promotes_dormant_into_vacancy() {
        let cache = cache(1);
        cache.add("a", 1).unwrap();
        cache.add("b", 2).unwrap();
        cache.active_remove(&"a").unwrap();

        assert!(cache.update(&"b", 20).unwrap());
        assert_eq!(cache.region_of(&"b").unwrap(), Some(Region::Active));
        assert_eq!(cache.get(&"b").unwrap(), Some(20));
    }

    #[tokio::test]
    async fn test_frequency_preserved_across_swap() {
        let cache = cache(1);
        cache.add("a", 1).unwrap();
        cache.add("b", 2).unwrap();

        cache.lookup(&"b").unwrap();
        assert_eq!(cache.region_of(&"b").unwrap(), Some(Region::Dormant));

        cache.lookup(&"b").unwrap();
        assert_eq!(cache.region_of(&"b").unwrap(), Some(Region::Active));
        assert_eq!(cache.frequency(&"b").unwrap(), Some(2));
        assert_eq!(cache.frequency(&"a").unwrap(), Some(0));

        let stats = cache.stats().unwrap();
        assert_eq!(stats.promotions, 1);
        assert_eq!(stats.demotions, 1);
    }

    #[tokio::test]
    async fn test_active_remove_ignores_dormant() {
        let cache = cache(1);
        cache.add("a", 1).unwrap();
        cache.add("b", 2).unwrap();

        assert_eq!(cache.active_remove(&"b").unwrap(), None);
        assert_eq!(cache.active_remove(&"a").unwrap(), Some(1));
        assert!(cache.contains(&"b").unwrap());
    }

    #[tokio::test]
    async fn test_operations_fail_after_dispose() {
        let cache = cache(2);
        cache.add("a", 1).unwrap();
        cache.dispose().await;
        cache.dispose().await;

        assert!(cache.is_disposed());
        assert_eq!(cache.add("b", 2), Err(CacheError::Disposed));
        assert_eq!(cache.lookup(&"a"), Err(CacheError::Disposed));
        assert_eq!(cache.count(), Err(CacheError::Disposed));
        assert_eq!(cache.remove(&"a"), Err(CacheError::Disposed));
    }
}
