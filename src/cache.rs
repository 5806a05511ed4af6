//! Opt-in LRU cache of built rasters
//!
//! Extraction is idempotent, so serving a repeated `SliceSpec` from memory
//! is observably identical to recomputing it. A cache belongs to exactly one
//! dataset; keys carry no dataset identity.

use crate::catalog::Dataset;
use crate::data_source::GridSource;
use crate::errors::Result;
use crate::pipeline::{build_raster, VisualizeOptions};
use crate::raster::{Orientation, RasterSlice};
use crate::selector::SliceSpec;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

type CacheKey = (SliceSpec, Orientation, bool);

pub struct SliceCache {
    entries: Mutex<LruCache<CacheKey, Arc<RasterSlice>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SliceCache {
    /// A cache holding at most `capacity` rasters (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the cached raster for `spec` or build and remember it.
    ///
    /// The lock is not held while building, so two concurrent misses for
    /// the same spec may both build; the results are identical.
    pub fn get_or_build<S: GridSource>(
        &self,
        dataset: &Dataset<S>,
        spec: &SliceSpec,
        options: &VisualizeOptions,
    ) -> Result<Arc<RasterSlice>> {
        let key = (spec.clone(), options.orientation, options.keep_native_coordinates);

        if let Some(hit) = self.lock().get(&key).cloned() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(variable = spec.variable(), "slice cache hit");
            return Ok(hit);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let raster = Arc::new(build_raster(dataset, spec, options)?);
        self.lock().put(key, Arc::clone(&raster));
        Ok(raster)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<CacheKey, Arc<RasterSlice>>> {
        // Entries are immutable Arcs; a panic elsewhere cannot leave one half-written.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for SliceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SliceCache")
            .field("len", &self.len())
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish()
    }
}
