//! Resource-bounded task execution.
//!
//! A counting semaphore admits at most `max_concurrent` tasks at once;
//! each admitted task races its work against a per-task timer. Tasks are
//! awaited under a "settle all, fail none" policy: one task's failure
//! never aborts its siblings, and every submitted task yields exactly one
//! [`TaskResult`].
//!
//! On timer expiry the task's [`CancellationToken`] is cancelled and its
//! slot is released. Cancellation is best-effort: the orchestrator moves
//! on, but work the task spawned internally may keep running until it
//! observes the token.

use futures::future::join_all;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::SourceError;

/// Admission and deadline limits for one batch of tasks.
#[derive(Debug, Clone)]
pub struct ExecutionLimits {
    /// Per-task deadline, measured from admission, not submission.
    pub timeout: Duration,

    /// Maximum tasks in flight simultaneously.
    pub max_concurrent: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_concurrent: 4,
        }
    }
}

/// A named unit of work with its cancellation handle.
pub struct Task<T> {
    name: String,
    cancel: CancellationToken,
    work: Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send>>,
}

impl<T> Task<T> {
    /// Create a task with a fresh cancellation token.
    ///
    /// Note the future is built before the token exists here; use
    /// [`Task::with_cancel`] when the work needs to observe its own token.
    pub fn new<F>(name: impl Into<String>, work: F) -> Self
    where
        F: Future<Output = Result<T, SourceError>> + Send + 'static,
    {
        Self::with_cancel(name, CancellationToken::new(), work)
    }

    /// Create a task whose work already holds a clone of `cancel`.
    pub fn with_cancel<F>(name: impl Into<String>, cancel: CancellationToken, work: F) -> Self
    where
        F: Future<Output = Result<T, SourceError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            cancel,
            work: Box::pin(work),
        }
    }

    /// The token cancelled when this task times out.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// The outcome of one submitted task. Produced exactly once per task.
#[derive(Debug, Clone)]
pub struct TaskResult<T> {
    /// Task name (the source name, for plugin searches).
    pub name: String,

    pub success: bool,

    /// Present iff `success`.
    pub payload: Option<T>,

    /// Present iff `!success`.
    pub error: Option<String>,

    /// Wall-clock time from admission to settlement.
    pub duration: Duration,
}

impl<T> TaskResult<T> {
    fn succeeded(name: String, payload: T, duration: Duration) -> Self {
        Self {
            name,
            success: true,
            payload: Some(payload),
            error: None,
            duration,
        }
    }

    fn failed(name: String, error: String, duration: Duration) -> Self {
        Self {
            name,
            success: false,
            payload: None,
            error: Some(error),
            duration,
        }
    }
}

/// Run every task under the given limits and settle them all.
///
/// Returns one result per task, in submission order, within
/// `timeout + scheduling overhead` of the last admission.
pub async fn execute_with_limits<T: Send + 'static>(
    tasks: Vec<Task<T>>,
    limits: &ExecutionLimits,
) -> Vec<TaskResult<T>> {
    let semaphore = Arc::new(Semaphore::new(limits.max_concurrent.max(1)));
    let timeout = limits.timeout;

    let settled = tasks.into_iter().map(|task| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            let Task { name, cancel, work } = task;
            let _permit = semaphore.acquire_owned().await.unwrap();

            debug!(task = %name, "task admitted");
            let start = Instant::now();

            match tokio::time::timeout(timeout, work).await {
                Ok(Ok(payload)) => {
                    let duration = start.elapsed();
                    debug!(task = %name, ?duration, "task settled");
                    TaskResult::succeeded(name, payload, duration)
                }
                Ok(Err(err)) => {
                    let duration = start.elapsed();
                    warn!(task = %name, %err, "task failed");
                    TaskResult::failed(name, err.to_string(), duration)
                }
                Err(_) => {
                    cancel.cancel();
                    let duration = start.elapsed();
                    warn!(task = %name, ?timeout, "task timed out, cancellation requested");
                    TaskResult::failed(
                        name,
                        format!("timed out after {}ms", timeout.as_millis()),
                        duration,
                    )
                }
            }
        }
    });

    join_all(settled).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quick_task(name: &str, value: u32) -> Task<u32> {
        Task::new(name, async move { Ok(value) })
    }

    #[tokio::test]
    async fn test_every_task_yields_exactly_one_result() {
        let tasks = vec![
            quick_task("a", 1),
            Task::new("b", async { Err(SourceError::Network("boom".into())) }),
            quick_task("c", 3),
        ];
        let limits = ExecutionLimits::default();

        let results = execute_with_limits(tasks, &limits).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].name, "a");
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[2].success);
        assert_eq!(results[2].payload, Some(3));
    }

    #[tokio::test]
    async fn test_failure_never_aborts_siblings() {
        let tasks = vec![
            Task::new("fails-fast", async {
                Err::<u32, _>(SourceError::Authentication("401".into()))
            }),
            Task::new("slow-but-fine", async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(7)
            }),
        ];
        let limits = ExecutionLimits {
            timeout: Duration::from_secs(1),
            max_concurrent: 2,
        };

        let results = execute_with_limits(tasks, &limits).await;

        assert!(!results[0].success);
        assert!(results[1].success);
        assert_eq!(results[1].payload, Some(7));
    }

    #[tokio::test]
    async fn test_in_flight_never_exceeds_limit() {
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<Task<u32>> = (0..8)
            .map(|i| {
                let current = Arc::clone(&current);
                let peak = Arc::clone(&peak);
                Task::new(format!("task-{i}"), async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    Ok(i)
                })
            })
            .collect();

        let limits = ExecutionLimits {
            timeout: Duration::from_secs(5),
            max_concurrent: 3,
        };
        let results = execute_with_limits(tasks, &limits).await;

        assert_eq!(results.len(), 8);
        assert!(results.iter().all(|r| r.success));
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_timeout_yields_result_and_cancels() {
        let cancel = CancellationToken::new();
        let observed = cancel.clone();

        let never_resolves = Task::with_cancel("stuck", cancel, async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(0u32)
        });
        let limits = ExecutionLimits {
            timeout: Duration::from_millis(40),
            max_concurrent: 1,
        };

        let results = execute_with_limits(vec![never_resolves], &limits).await;

        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert!(results[0].error.as_ref().unwrap().contains("timed out"));
        assert!(observed.is_cancelled());
    }

    #[tokio::test]
    async fn test_timed_out_task_releases_its_slot() {
        let stuck = Task::new("stuck", async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(0u32)
        });
        let quick = quick_task("quick", 9);

        let limits = ExecutionLimits {
            timeout: Duration::from_millis(40),
            max_concurrent: 1,
        };
        let start = Instant::now();
        let results = execute_with_limits(vec![stuck, quick], &limits).await;

        assert!(!results[0].success);
        assert!(results[1].success);
        // The second task ran after the first timed out, not after 60s.
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
