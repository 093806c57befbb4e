//! Wall-clock time budget for one search request.
//!
//! A total budget is split into phase sub-budgets up front; `remaining()`
//! tracks what is left as the request runs. Collection stops early once
//! the budget is nearly spent or a good-enough candidate count is reached,
//! trading completeness for latency.

use std::time::{Duration, Instant};

/// Minimum remaining budget worth dispatching more work for.
const COLLECTION_FLOOR: Duration = Duration::from_secs(1);

/// Tracks elapsed time against a total allowance, with derived
/// per-phase sub-budgets.
#[derive(Debug, Clone)]
pub struct TimeBudget {
    total: Duration,
    started: Instant,
    good_enough: usize,
}

impl TimeBudget {
    /// Start the clock on a new budget.
    pub fn new(total: Duration) -> Self {
        Self {
            total,
            started: Instant::now(),
            good_enough: 20,
        }
    }

    /// Override the good-enough candidate count (default 20).
    pub fn with_good_enough(mut self, count: usize) -> Self {
        self.good_enough = count;
        self
    }

    /// The full allowance.
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Slice allotted to a single source task.
    pub fn per_source(&self) -> Duration {
        self.total / 6
    }

    /// Slice allotted to processing one candidate.
    pub fn per_candidate(&self) -> Duration {
        self.total / 45
    }

    /// Slice allotted to one AI-assisted operation.
    pub fn per_ai_operation(&self) -> Duration {
        self.total / 9
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left, saturating at zero.
    pub fn remaining(&self) -> Duration {
        self.total.saturating_sub(self.elapsed())
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Whether another collection wave is worth dispatching.
    ///
    /// False once less than a second remains or `candidates_found` already
    /// meets the good-enough target.
    pub fn should_continue_collection(&self, candidates_found: usize) -> bool {
        self.remaining() >= COLLECTION_FLOOR && candidates_found < self.good_enough
    }

    /// The per-source slice, clamped to what is actually left.
    pub fn source_deadline(&self) -> Duration {
        self.per_source().min(self.remaining())
    }
}

/// Race an operation against a timer.
///
/// Expiry means "no data", not an error: the caller gets `None` and
/// decides what degraded behavior looks like.
pub async fn with_timeout<F, T>(operation: F, limit: Duration) -> Option<T>
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(limit, operation).await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_slices() {
        let budget = TimeBudget::new(Duration::from_secs(90));
        assert_eq!(budget.per_source(), Duration::from_secs(15));
        assert_eq!(budget.per_candidate(), Duration::from_secs(2));
        assert_eq!(budget.per_ai_operation(), Duration::from_secs(10));
    }

    #[test]
    fn test_remaining_saturates() {
        let budget = TimeBudget::new(Duration::ZERO);
        assert_eq!(budget.remaining(), Duration::ZERO);
        assert!(budget.is_exhausted());
    }

    #[test]
    fn test_good_enough_stops_collection() {
        let budget = TimeBudget::new(Duration::from_secs(90)).with_good_enough(10);
        assert!(budget.should_continue_collection(9));
        assert!(!budget.should_continue_collection(10));
        assert!(!budget.should_continue_collection(50));
    }

    #[test]
    fn test_near_empty_budget_stops_collection() {
        let budget = TimeBudget::new(Duration::from_millis(500));
        assert!(!budget.should_continue_collection(0));
    }

    #[tokio::test]
    async fn test_with_timeout_returns_value() {
        let value = with_timeout(async { 42 }, Duration::from_secs(1)).await;
        assert_eq!(value, Some(42));
    }

    #[tokio::test]
    async fn test_with_timeout_expiry_is_none_not_error() {
        let value: Option<u32> = with_timeout(
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                1
            },
            Duration::from_millis(20),
        )
        .await;
        assert_eq!(value, None);
    }
}
