use std::sync::atomic::{AtomicU64, Ordering};

/// Cumulative hit/miss counters for the redirect path.
///
/// Both counters only ever grow for the lifetime of the process.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    resolutions: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolution answered from the cache.
    pub fn record_hit(&self) {
        // resolutions first so a concurrent reader never sees hits > resolutions
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    /// A resolution that had to fall through to the store.
    pub fn record_miss(&self) {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::SeqCst)
    }

    /// Fraction of resolutions answered from the cache, in `[0, 1]`.
    ///
    /// Returns `0.0` before the first resolution.
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits();
        let resolutions = self.resolutions();
        if resolutions == 0 {
            0.0
        } else {
            (hits as f64 / resolutions as f64).min(1.0)
        }
    }
}
