use crate::error::{CacheError, Result};
use crate::policy::{LogRecencyScore, ScorePolicy};
use crate::stats::CacheStats;
use jiff::Timestamp;
use parking_lot::Mutex;
use redishort_core::{LinkRecord, ShortCode};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;

const DEFAULT_CAPACITY: usize = 1_000;

/// Position of a record in the score index.
///
/// Scores are compared with [`f64::total_cmp`] and ties are broken by the
/// sequence number handed out when the entry was (re)inserted, so the index
/// is a total order even when two records compute the same score. Among
/// equal scores the oldest insertion sorts first and is evicted first.
#[derive(Debug, Clone, Copy)]
struct ScoreKey {
    score: f64,
    seq: u64,
}

impl Ord for ScoreKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for ScoreKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScoreKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoreKey {}

#[derive(Debug)]
struct Entry {
    record: LinkRecord,
    key: ScoreKey,
}

/// Both indices live behind one lock so no reader can ever see a code in
/// one of them but not the other.
#[derive(Debug, Default)]
struct Indices {
    by_code: HashMap<ShortCode, Entry>,
    by_score: BTreeMap<ScoreKey, ShortCode>,
    next_seq: u64,
}

impl Indices {
    fn next_key(&mut self, score: f64) -> ScoreKey {
        let key = ScoreKey {
            score,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        key
    }

    fn insert(&mut self, record: LinkRecord, score: f64) {
        let key = self.next_key(score);
        self.by_score.insert(key, record.code.clone());
        self.by_code.insert(record.code.clone(), Entry { record, key });
    }

    /// Removes and returns the lowest-ranked coherent entry.
    ///
    /// Score entries that point at a code with a different (or no) key-index
    /// entry are dropped on the way.
    fn pop_min(&mut self) -> Option<(ScoreKey, LinkRecord)> {
        while let Some((key, code)) = self.by_score.pop_first() {
            let coherent = self.by_code.get(&code).is_some_and(|entry| entry.key == key);
            if coherent {
                if let Some(entry) = self.by_code.remove(&code) {
                    return Some((key, entry.record));
                }
            }
            warn!(code = %code, "dropping orphaned score index entry");
        }
        None
    }

    /// Drops every trace of `code` from both indices.
    fn purge(&mut self, code: &ShortCode) {
        self.by_code.remove(code);
        self.by_score.retain(|_, c| c != code);
    }

    /// Drops key-index entries that have no matching score-index entry and
    /// returns how many were dropped.
    fn drop_unranked(&mut self) -> usize {
        let before = self.by_code.len();
        let by_score = &self.by_score;
        self.by_code.retain(|code, entry| {
            let ranked = by_score.get(&entry.key) == Some(code);
            if !ranked {
                warn!(code = %code, "dropping unranked key index entry");
            }
            ranked
        });
        before - self.by_code.len()
    }

    fn is_coherent(&self) -> bool {
        self.by_code.len() == self.by_score.len()
            && self.by_score.iter().all(|(key, code)| {
                self.by_code
                    .get(code)
                    .is_some_and(|entry| entry.key == *key && entry.record.code == *code)
            })
    }
}

/// Outcome of offering a record to [`ScoredCache::admit`].
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// There was free capacity; the record was inserted.
    Inserted,
    /// The code was already cached; its entry was refreshed and re-scored.
    Refreshed,
    /// The cache was full and the record outranked the minimum, which was evicted.
    Replaced { evicted: LinkRecord },
    /// The cache was full and the record did not outrank the minimum.
    Rejected,
}

impl Admission {
    /// Whether the candidate is in the cache after the admission.
    pub fn is_cached(&self) -> bool {
        !matches!(self, Admission::Rejected)
    }
}

/// Configuration for creating a [`ScoredCache`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct CacheConfig {
    /// Maximum number of records the cache can hold.
    #[builder(default = DEFAULT_CAPACITY)]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A bounded mapping from short code to [`LinkRecord`], ranked by score.
///
/// - `lookup` is an `O(1)` read that never changes the ranking.
/// - `touch` records a visit and re-ranks the record.
/// - `admit` inserts while there is room; once full, a candidate only gets in
///   by strictly outranking the current minimum, which is then evicted.
///
/// Every operation holds a single lock for its whole mutation, so the two
/// indices are always observed in agreement.
pub struct ScoredCache {
    capacity: usize,
    policy: Box<dyn ScorePolicy>,
    indices: Mutex<Indices>,
    stats: CacheStats,
}

impl std::fmt::Debug for ScoredCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoredCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl ScoredCache {
    /// Creates a cache ranked by [`LogRecencyScore`].
    pub fn new(capacity: usize) -> Self {
        Self::with_policy(capacity, LogRecencyScore)
    }

    /// Creates a cache ranked by a custom policy.
    pub fn with_policy(capacity: usize, policy: impl ScorePolicy) -> Self {
        Self {
            capacity,
            policy: Box::new(policy),
            indices: Mutex::new(Indices::default()),
            stats: CacheStats::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.indices.lock().by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hit/miss counters fed by the resolver.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn hit_ratio(&self) -> f64 {
        self.stats.hit_ratio()
    }

    /// Returns a copy of the cached record, without touching its score.
    pub fn lookup(&self, code: &ShortCode) -> Option<LinkRecord> {
        self.indices
            .lock()
            .by_code
            .get(code)
            .map(|entry| entry.record.clone())
    }

    pub fn contains(&self, code: &ShortCode) -> bool {
        self.indices.lock().by_code.contains_key(code)
    }

    /// Records a visit at `now` and re-ranks the record.
    ///
    /// Returns the updated record, or `Ok(None)` if the code is not cached
    /// (for instance because it was evicted after a `lookup`). If the two
    /// indices are found to disagree about `code`, the entry is dropped from
    /// both and [`CacheError::InvariantViolation`] is returned.
    pub fn touch(&self, code: &ShortCode, now: Timestamp) -> Result<Option<LinkRecord>> {
        let mut guard = self.indices.lock();
        let indices = &mut *guard;

        let Some(entry) = indices.by_code.get_mut(code) else {
            return Ok(None);
        };

        let old_key = entry.key;
        match indices.by_score.remove(&old_key) {
            Some(indexed) if indexed == *code => {}
            other => {
                if let Some(indexed) = other {
                    // the key belonged to someone else, put it back
                    indices.by_score.insert(old_key, indexed);
                }
                warn!(code = %code, "cache indices disagree, dropping entry");
                indices.purge(code);
                return Err(CacheError::InvariantViolation(code.clone()));
            }
        }

        entry.record.record_visit(now);
        let score = self.policy.score(&entry.record);
        let key = ScoreKey {
            score,
            seq: indices.next_seq,
        };
        indices.next_seq += 1;
        entry.key = key;
        let record = entry.record.clone();
        indices.by_score.insert(key, code.clone());

        trace!(code = %code, score, visits = record.visit_count, "touched cache entry");
        Ok(Some(record))
    }

    /// Offers a candidate, ranked by the cache's [`ScorePolicy`].
    pub fn admit(&self, candidate: LinkRecord) -> Admission {
        self.admit_scored_by(candidate, |record| self.policy.score(record))
    }

    /// Offers a candidate with an explicitly computed score.
    pub fn admit_with_score(&self, candidate: LinkRecord, score: f64) -> Admission {
        self.admit_scored_by(candidate, |_| score)
    }

    fn admit_scored_by(
        &self,
        candidate: LinkRecord,
        scorer: impl FnOnce(&LinkRecord) -> f64,
    ) -> Admission {
        if self.capacity == 0 {
            return Admission::Rejected;
        }

        let mut guard = self.indices.lock();
        let indices = &mut *guard;

        if let Some(mut existing) = indices.by_code.remove(&candidate.code) {
            // Two misses for the same code can race to admit it. Keep one
            // entry and let it carry the furthest-advanced visit state.
            indices.by_score.remove(&existing.key);
            existing.record.visit_count = existing.record.visit_count.max(candidate.visit_count);
            existing.record.last_visit_at = existing.record.last_visit_at.max(candidate.last_visit_at);
            let score = scorer(&existing.record);
            indices.insert(existing.record, score);
            trace!(code = %candidate.code, score, "refreshed cache entry");
            return Admission::Refreshed;
        }

        let score = scorer(&candidate);

        if indices.by_code.len() < self.capacity {
            trace!(code = %candidate.code, score, "admitted into free slot");
            indices.insert(candidate, score);
            return Admission::Inserted;
        }

        let Some(min_score) = indices.by_score.first_key_value().map(|(key, _)| key.score) else {
            return self.admit_after_repair(indices, candidate, score);
        };

        // ties go to the incumbent
        if score.total_cmp(&min_score) != Ordering::Greater {
            trace!(code = %candidate.code, score, min_score, "admission rejected");
            return Admission::Rejected;
        }

        match indices.pop_min() {
            Some((_, evicted)) => {
                debug!(
                    evicted = %evicted.code,
                    admitted = %candidate.code,
                    score,
                    min_score,
                    "evicted lowest-ranked entry"
                );
                indices.insert(candidate, score);
                Admission::Replaced { evicted }
            }
            None => self.admit_after_repair(indices, candidate, score),
        }
    }

    /// The cache is full by count but has no rankable minimum, so some
    /// key-index entries are unranked. Drop them, then admit only into real
    /// free space.
    fn admit_after_repair(
        &self,
        indices: &mut Indices,
        candidate: LinkRecord,
        score: f64,
    ) -> Admission {
        let dropped = indices.drop_unranked();
        if indices.by_code.len() < self.capacity {
            debug!(code = %candidate.code, score, dropped, "admitted after dropping unranked entries");
            indices.insert(candidate, score);
            Admission::Inserted
        } else {
            Admission::Rejected
        }
    }

    /// Removes and returns the lowest-ranked record.
    pub fn evict_min(&self) -> Option<LinkRecord> {
        let evicted = self.indices.lock().pop_min().map(|(_, record)| record);
        if let Some(record) = &evicted {
            debug!(code = %record.code, "evicted minimum entry");
        }
        evicted
    }

    /// Returns up to `n` records, best ranked first, leaving the cache as is.
    pub fn top(&self, n: usize) -> Vec<LinkRecord> {
        let indices = self.indices.lock();
        indices
            .by_score
            .values()
            .rev()
            .filter_map(|code| indices.by_code.get(code))
            .take(n)
            .map(|entry| entry.record.clone())
            .collect()
    }

    /// Removes `code` from the score index only, leaving its key-index entry
    /// behind. Lets callers exercise their handling of
    /// [`CacheError::InvariantViolation`].
    #[doc(hidden)]
    pub fn detach_score_entry(&self, code: &ShortCode) -> bool {
        let mut indices = self.indices.lock();
        let Some(key) = indices.by_code.get(code).map(|entry| entry.key) else {
            return false;
        };
        indices.by_score.remove(&key).is_some()
    }

    /// Checks that every key-index entry has exactly one matching
    /// score-index entry and vice versa.
    pub fn is_coherent(&self) -> bool {
        self.indices.lock().is_coherent()
    }
}

impl From<CacheConfig> for ScoredCache {
    fn from(config: CacheConfig) -> Self {
        ScoredCache::new(config.capacity)
    }
}
