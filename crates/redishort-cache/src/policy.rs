use redishort_core::LinkRecord;

/// Ranks a cached record. Higher scores are kept, the lowest is evicted first.
///
/// The cache recomputes the score every time a record is admitted or
/// touched, so implementations only need to look at the record itself.
pub trait ScorePolicy: Send + Sync + 'static {
    fn score(&self, record: &LinkRecord) -> f64;
}

impl<F> ScorePolicy for F
where
    F: Fn(&LinkRecord) -> f64 + Send + Sync + 'static,
{
    fn score(&self, record: &LinkRecord) -> f64 {
        self(record)
    }
}

/// Visits per millisecond of age, weighted by the log of the last visit time:
///
/// ```text
/// score = ln(last_visit_at_ms) * visit_count / (last_visit_at_ms - created_at_ms)
/// ```
///
/// Timestamps are raw Unix epoch milliseconds. Because `ln` of an epoch value
/// barely changes between records created close in time, the ranking is
/// dominated by `visit_count / age`. The age is clamped to at least 1 ms and
/// the `ln` argument to at least 1 so the score is always finite.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRecencyScore;

impl ScorePolicy for LogRecencyScore {
    #[allow(clippy::cast_precision_loss)]
    fn score(&self, record: &LinkRecord) -> f64 {
        let last_visit = record.last_visit_at.as_millisecond();
        let created = record.created_at.as_millisecond();

        let age = last_visit.saturating_sub(created).max(1) as f64;
        let recency = (last_visit.max(1) as f64).ln();

        recency * record.visit_count as f64 / age
    }
}
