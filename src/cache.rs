use lru::LruCache as Lru;
use std::{collections::HashMap, fmt::Debug, num::NonZeroUsize, sync::Mutex};

/// A cache to avoid looking up the same image more than once.
///
/// Each entry maps a resolution key to either an image URL or `None`, meaning
/// we already know there is no image to be found. Entries are never expired,
/// so implementations only need to care about how much they keep around.
pub trait Cache: Debug + Send + Sync {
    /// Look up a previously resolved image.
    ///
    /// The outer [`Option`] says whether the key is known, the inner one is
    /// the cached result (which may itself be "no image").
    fn get(&self, key: &str) -> Option<Option<String>>;
    /// Update the cache entry for `key`.
    fn insert(&self, key: &str, image: Option<String>);
}

impl<'c, C: Cache> Cache for &'c C {
    fn get(&self, key: &str) -> Option<Option<String>> { (**self).get(key) }

    fn insert(&self, key: &str, image: Option<String>) {
        (**self).insert(key, image);
    }
}

impl<C: Cache + ?Sized> Cache for Box<C> {
    fn get(&self, key: &str) -> Option<Option<String>> { (**self).get(key) }

    fn insert(&self, key: &str, image: Option<String>) {
        (**self).insert(key, image);
    }
}

/// An unbounded in-memory [`Cache`] which lives as long as it is kept around.
///
/// We need interior mutability because lookups are done concurrently. The
/// lock is only ever held for the duration of a single `get()` or `insert()`,
/// so a [`std::sync::Mutex`] is fine.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Option<String>>>,
}

impl MemoryCache {
    /// Create a new, empty [`MemoryCache`].
    pub fn new() -> Self { MemoryCache::default() }

    /// How many keys are known?
    pub fn len(&self) -> usize { self.entries().len() }

    /// Is the cache empty?
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    fn entries(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, Option<String>>> {
        self.entries.lock().expect("Mutex was poisoned")
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Option<String>> {
        self.entries().get(key).cloned()
    }

    fn insert(&self, key: &str, image: Option<String>) {
        self.entries().insert(key.to_string(), image);
    }
}

/// A [`Cache`] holding at most `capacity` entries, evicting whichever was
/// least recently used.
#[derive(Debug)]
pub struct LruCache {
    entries: Mutex<Lru<String, Option<String>>>,
}

impl LruCache {
    /// Create an empty [`LruCache`].
    pub fn new(capacity: NonZeroUsize) -> Self {
        LruCache {
            entries: Mutex::new(Lru::new(capacity)),
        }
    }

    /// The maximum number of entries kept.
    pub fn capacity(&self) -> NonZeroUsize { self.entries().cap() }

    /// How many keys are currently known?
    pub fn len(&self) -> usize { self.entries().len() }

    /// Is the cache empty?
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    fn entries(
        &self,
    ) -> std::sync::MutexGuard<'_, Lru<String, Option<String>>> {
        self.entries.lock().expect("Mutex was poisoned")
    }
}

impl Cache for LruCache {
    fn get(&self, key: &str) -> Option<Option<String>> {
        self.entries().get(key).cloned()
    }

    fn insert(&self, key: &str, image: Option<String>) {
        self.entries().put(key.to_string(), image);
    }
}
