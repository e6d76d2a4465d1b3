use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// The persisted unit of state for one short code.
///
/// `visit_count` starts at zero: creating a link is not a visit. The
/// ranking score is deliberately absent, it only exists inside the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Primary key in both the store and the cache.
    pub code: ShortCode,
    /// The original long URL. Never changes after creation.
    pub target: String,
    pub created_at: Timestamp,
    pub visit_count: u64,
    /// Time of the most recent resolution, `created_at` until the first one.
    pub last_visit_at: Timestamp,
}

impl LinkRecord {
    /// Creates a fresh record that has never been visited.
    pub fn new(code: ShortCode, target: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            code,
            target: target.into(),
            created_at,
            visit_count: 0,
            last_visit_at: created_at,
        }
    }

    /// Returns a copy of this record with one more visit recorded at `at`.
    ///
    /// The visit time never moves backwards and never precedes creation,
    /// even if `at` comes from a clock that has stepped back.
    pub fn visited(&self, at: Timestamp) -> Self {
        let mut next = self.clone();
        next.record_visit(at);
        next
    }

    /// In-place form of [`LinkRecord::visited`].
    pub fn record_visit(&mut self, at: Timestamp) {
        self.visit_count = self.visit_count.saturating_add(1);
        self.last_visit_at = at.max(self.last_visit_at).max(self.created_at);
    }
}
