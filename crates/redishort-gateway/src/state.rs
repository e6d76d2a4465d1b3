use std::sync::Arc;

use redishort_cache::ScoredCache;
use redishort_redirector::Redirector;
use redishort_shortener::Shortener;

/// Number of codes reported by the top-links endpoint.
pub const TOP_LINKS: usize = 5;

#[derive(Clone)]
pub struct AppState {
    redirector: Arc<dyn Redirector>,
    shortener: Arc<dyn Shortener>,
    cache: Arc<ScoredCache>,
}

impl AppState {
    /// `cache` should be the same instance the redirector resolves through,
    /// otherwise the stats and top-links endpoints describe a cache nobody uses.
    pub fn new(
        redirector: Arc<dyn Redirector>,
        shortener: Arc<dyn Shortener>,
        cache: Arc<ScoredCache>,
    ) -> Self {
        Self {
            redirector,
            shortener,
            cache,
        }
    }

    pub fn redirector(&self) -> &dyn Redirector {
        self.redirector.as_ref()
    }

    pub fn shortener(&self) -> &dyn Shortener {
        self.shortener.as_ref()
    }

    pub fn cache(&self) -> &ScoredCache {
        &self.cache
    }
}
