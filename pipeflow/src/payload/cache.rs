//! Thread-safe, type-keyed payload cache.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// A type-erased payload, downcast-checked on retrieval.
pub type PayloadSlot = Arc<dyn Any + Send + Sync>;

/// A thread-safe store mapping a type identity to one instance of that type.
///
/// Each cache is owned by exactly one context; population is lazy and safe
/// for concurrent readers and writers. Per-type-key operations are atomic:
/// racing `get_or_add` callers all observe the same winning instance, and
/// concurrent `add_or_update` calls apply in a strict per-key sequence.
#[derive(Default)]
pub struct PayloadCache {
    slots: DashMap<TypeId, PayloadSlot>,
}

impl PayloadCache {
    /// Creates a new empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks whether an instance of `T` is currently stored.
    #[must_use]
    pub fn has<T: Any + Send + Sync>(&self) -> bool {
        self.slots.contains_key(&TypeId::of::<T>())
    }

    /// Gets the stored instance of `T`, if any.
    #[must_use]
    pub fn try_get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.slots
            .get(&TypeId::of::<T>())
            .and_then(|slot| slot.value().clone().downcast::<T>().ok())
    }

    /// Gets the stored instance of `T`, invoking `factory` to create and
    /// atomically publish one if absent.
    ///
    /// Racing callers all receive the same instance; a losing caller's
    /// construction is discarded, never observed. `factory` runs while the
    /// key's slot is held and must not reach back into the same cache.
    pub fn get_or_add<T, F>(&self, factory: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let slot = self
            .slots
            .entry(TypeId::of::<T>())
            .or_insert_with(|| {
                let created: PayloadSlot = Arc::new(factory());
                created
            })
            .clone();

        downcast_slot(slot)
    }

    /// Inserts via `add` when `T` is absent, otherwise replaces the stored
    /// value with `update(old)`. Linearizable per type key: concurrent
    /// callers observe a strict sequence of insert/update operations.
    pub fn add_or_update<T, A, U>(&self, add: A, update: U) -> Arc<T>
    where
        T: Any + Send + Sync,
        A: FnOnce() -> T,
        U: Fn(&T) -> T,
    {
        match self.slots.entry(TypeId::of::<T>()) {
            Entry::Occupied(mut occupied) => {
                let current: Arc<T> = downcast_slot(occupied.get().clone());
                let next = Arc::new(update(&current));
                let slot: PayloadSlot = next.clone();
                occupied.insert(slot);
                next
            }
            Entry::Vacant(vacant) => {
                let value = Arc::new(add());
                let slot: PayloadSlot = value.clone();
                vacant.insert(slot);
                value
            }
        }
    }

    /// Returns the number of stored payload types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Preloads a value, replacing any existing instance of `T`.
    pub(crate) fn preload<T: Any + Send + Sync>(&self, value: T) {
        self.slots.insert(TypeId::of::<T>(), Arc::new(value));
    }
}

impl std::fmt::Debug for PayloadCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadCache")
            .field("len", &self.len())
            .finish()
    }
}

// Slots are keyed by their own TypeId, so the downcast cannot fail.
#[allow(clippy::expect_used)]
fn downcast_slot<T: Any + Send + Sync>(slot: PayloadSlot) -> Arc<T> {
    slot.downcast::<T>()
        .expect("payload slot keyed by its TypeId")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    struct TraceId(String);

    #[derive(Debug)]
    struct RetryBudget {
        remaining: u32,
    }

    #[test]
    fn test_empty_cache() {
        let cache = PayloadCache::new();

        assert!(cache.is_empty());
        assert!(!cache.has::<TraceId>());
        assert!(cache.try_get::<TraceId>().is_none());
    }

    #[test]
    fn test_get_or_add_publishes() {
        let cache = PayloadCache::new();

        let created = cache.get_or_add(|| TraceId("abc".to_string()));
        let fetched = cache.try_get::<TraceId>();

        assert!(cache.has::<TraceId>());
        assert_eq!(cache.len(), 1);
        assert!(fetched.is_some_and(|fetched| Arc::ptr_eq(&created, &fetched)));
    }

    #[test]
    fn test_get_or_add_keeps_existing() {
        let cache = PayloadCache::new();

        let first = cache.get_or_add(|| TraceId("first".to_string()));
        let second = cache.get_or_add(|| TraceId("second".to_string()));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.0, "first");
    }

    #[test]
    fn test_distinct_types_do_not_collide() {
        let cache = PayloadCache::new();

        cache.get_or_add(|| TraceId("abc".to_string()));
        cache.get_or_add(|| RetryBudget { remaining: 3 });

        assert_eq!(cache.len(), 2);
        assert!(cache.has::<TraceId>());
        assert!(cache.has::<RetryBudget>());
    }

    #[test]
    fn test_add_or_update_inserts_then_updates() {
        let cache = PayloadCache::new();

        let added = cache.add_or_update(
            || RetryBudget { remaining: 3 },
            |old| RetryBudget {
                remaining: old.remaining - 1,
            },
        );
        assert_eq!(added.remaining, 3);

        let updated = cache.add_or_update(
            || RetryBudget { remaining: 3 },
            |old| RetryBudget {
                remaining: old.remaining - 1,
            },
        );
        assert_eq!(updated.remaining, 2);
    }

    #[test]
    fn test_concurrent_get_or_add_single_winner() {
        let cache = Arc::new(PayloadCache::new());
        let constructions = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let constructions = Arc::clone(&constructions);
                std::thread::spawn(move || {
                    cache.get_or_add(|| {
                        constructions.fetch_add(1, Ordering::SeqCst);
                        TraceId("winner".to_string())
                    })
                })
            })
            .collect();

        let results: Vec<Arc<TraceId>> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        // All callers observe the same instance.
        for result in &results[1..] {
            assert!(Arc::ptr_eq(&results[0], result));
        }

        let count = constructions.load(Ordering::SeqCst);
        assert!((1..=16).contains(&count));
    }

    #[test]
    fn test_concurrent_add_or_update_no_lost_updates() {
        let cache = Arc::new(PayloadCache::new());

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache.add_or_update(
                        || RetryBudget { remaining: 1 },
                        |old| RetryBudget {
                            remaining: old.remaining + 1,
                        },
                    );
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        // One insert of 1, thirty-one increments: no update lost.
        let final_value = cache.try_get::<RetryBudget>().unwrap();
        assert_eq!(final_value.remaining, 32);
    }
}
