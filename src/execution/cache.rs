//! Filter result caching.
//!
//! Caches special images produced by filter stages so that re-running a
//! pipeline over unchanged input skips the work. Entries are keyed by the
//! input image's unique id, its subset, a hash of the stage parameters and
//! a hash of the filter context the stage ran under.

use crate::core::config::CacheConfig;
use crate::core::geometry::IRect;
use crate::special::{SpecialImage, SpecialImageRef};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cache key combining the input's identity with the stage's hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Unique id of the input special image.
    pub image_id: u32,
    /// Subset of the input, in backing coordinates.
    pub subset: IRect,
    /// Hash of the stage and its parameters.
    pub stage_hash: u64,
    /// Hash of the context (props, sampling) the stage ran under.
    pub context_hash: u64,
}

impl CacheKey {
    /// Key for applying a stage with `stage_hash` to `input`.
    pub fn new(input: &dyn SpecialImage, stage_hash: u64) -> Self {
        Self {
            image_id: input.unique_id(),
            subset: input.subset(),
            stage_hash,
            context_hash: 0,
        }
    }

    /// Same key, scoped to a filter context.
    pub fn with_context(mut self, context_hash: u64) -> Self {
        self.context_hash = context_hash;
        self
    }
}

/// Cached entry with metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached output.
    pub image: SpecialImageRef,
    /// When the entry was created.
    pub created_at: Instant,
    /// How long the original computation took.
    pub computation_time: Duration,
    /// Backing memory attributed to the entry.
    pub memory_size: usize,
}

impl CacheEntry {
    pub fn new(image: SpecialImageRef, computation_time: Duration) -> Self {
        let memory_size = image.size();
        Self {
            image,
            created_at: Instant::now(),
            computation_time,
            memory_size,
        }
    }

    /// Check if the entry has expired.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries evicted.
    pub evictions: u64,
    /// Total time saved by cache hits.
    pub time_saved: Duration,
}

impl CacheStats {
    /// Calculate hit ratio.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(64) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

/// Thread-safe cache of filter outputs.
pub struct SpecialImageCache {
    cache: Mutex<LruCache<CacheKey, CacheEntry>>,
    /// Maximum memory usage in bytes.
    max_memory: usize,
    current_memory: Mutex<usize>,
    ttl: Duration,
    stats: Mutex<CacheStats>,
}

impl SpecialImageCache {
    /// Create a cache holding at most `capacity` images.
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY),
            )),
            max_memory: 256 * 1024 * 1024,
            current_memory: Mutex::new(0),
            ttl: Duration::from_secs(600),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Create a cache with custom memory limit.
    pub fn with_memory_limit(capacity: usize, max_memory_mb: usize) -> Self {
        let mut cache = Self::new(capacity);
        cache.max_memory = max_memory_mb * 1024 * 1024;
        cache
    }

    /// Create a cache from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_memory_limit(config.capacity, config.max_memory_mb).with_ttl(config.ttl())
    }

    /// Set the TTL for cache entries.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Get a cached image.
    pub fn get(&self, key: &CacheKey) -> Option<SpecialImageRef> {
        let mut cache = self.cache.lock();

        if let Some(entry) = cache.get(key) {
            if entry.is_expired(self.ttl) {
                if let Some(expired) = cache.pop(key) {
                    let mut current = self.current_memory.lock();
                    *current = current.saturating_sub(expired.memory_size);
                }
                self.stats.lock().misses += 1;
                return None;
            }

            let mut stats = self.stats.lock();
            stats.hits += 1;
            stats.time_saved += entry.computation_time;
            log::trace!("Cache hit for image {} stage {:x}", key.image_id, key.stage_hash);
            Some(Arc::clone(&entry.image))
        } else {
            self.stats.lock().misses += 1;
            None
        }
    }

    /// Store an image in the cache.
    ///
    /// Images larger than the whole memory budget are not cached.
    pub fn put(&self, key: CacheKey, image: SpecialImageRef, computation_time: Duration) {
        let entry = CacheEntry::new(image, computation_time);
        let entry_size = entry.memory_size;
        if entry_size > self.max_memory {
            log::debug!("Not caching {} byte image, budget is {}", entry_size, self.max_memory);
            return;
        }

        let mut cache = self.cache.lock();
        let mut current = self.current_memory.lock();
        if let Some(replaced) = cache.pop(&key) {
            *current = current.saturating_sub(replaced.memory_size);
        }
        while *current + entry_size > self.max_memory {
            match cache.pop_lru() {
                Some((_, evicted)) => {
                    *current = current.saturating_sub(evicted.memory_size);
                    self.stats.lock().evictions += 1;
                }
                None => break,
            }
        }
        if let Some((_, evicted)) = cache.push(key, entry) {
            // Capacity eviction; `push` only returns the same key when
            // replacing, which was popped above.
            *current = current.saturating_sub(evicted.memory_size);
            self.stats.lock().evictions += 1;
        }
        *current += entry_size;
    }

    /// Invalidate a specific entry.
    pub fn invalidate(&self, key: &CacheKey) {
        let mut cache = self.cache.lock();
        if let Some(entry) = cache.pop(key) {
            let mut current = self.current_memory.lock();
            *current = current.saturating_sub(entry.memory_size);
        }
    }

    /// Invalidate all entries computed from the image with `image_id`.
    pub fn invalidate_image(&self, image_id: u32) {
        let mut cache = self.cache.lock();
        let keys_to_remove: Vec<_> = cache
            .iter()
            .filter(|(k, _)| k.image_id == image_id)
            .map(|(k, _)| *k)
            .collect();

        let mut total_freed = 0;
        for key in keys_to_remove {
            if let Some(entry) = cache.pop(&key) {
                total_freed += entry.memory_size;
            }
        }

        let mut current = self.current_memory.lock();
        *current = current.saturating_sub(total_freed);
    }

    /// Clear the entire cache.
    pub fn clear(&self) {
        let mut cache = self.cache.lock();
        cache.clear();
        *self.current_memory.lock() = 0;
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }

    /// Get current memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        *self.current_memory.lock()
    }

    /// Get number of cached entries.
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SpecialImageCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl std::fmt::Debug for SpecialImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecialImageCache")
            .field("len", &self.len())
            .field("memory_usage", &self.memory_usage())
            .field("max_memory", &self.max_memory)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// A shared cache wrapped in Arc.
pub type SharedCache = Arc<SpecialImageCache>;

/// Create a new shared cache.
pub fn new_shared_cache(capacity: usize) -> SharedCache {
    Arc::new(SpecialImageCache::new(capacity))
}
