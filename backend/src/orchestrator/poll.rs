//! Polling primitives
//!
//! `poll_until_done` drives a long-running provider operation to completion
//! at a fixed interval. It has no attempt ceiling of its own; callers that
//! need one race the whole task against `with_deadline`.

use crate::orchestrator::error::TaskError;
use crate::provider::Operation;
use std::future::Future;
use std::time::Duration;

/// Refresh `initial` every `interval` until it reports `done`
///
/// The wait comes before each refresh. An operation that is already done is
/// returned without polling. The first `poll` error is returned as-is.
pub async fn poll_until_done<F, Fut, E>(
    initial: Operation,
    mut poll: F,
    interval: Duration,
) -> Result<Operation, E>
where
    F: FnMut(Operation) -> Fut,
    Fut: Future<Output = Result<Operation, E>>,
{
    let mut current = initial;
    let mut attempts: u32 = 0;

    while !current.done {
        tokio::time::sleep(interval).await;
        attempts += 1;
        current = poll(current).await?;
        tracing::debug!(
            operation = %current.name,
            attempt = attempts,
            done = current.done,
            "Polled operation"
        );
    }

    Ok(current)
}

/// Run `task`, giving up once `deadline` has elapsed
///
/// When the deadline fires the inner future is dropped and its eventual
/// result discarded.
pub async fn with_deadline<T, Fut>(deadline: Duration, task: Fut) -> Result<T, TaskError>
where
    Fut: Future<Output = Result<T, TaskError>>,
{
    match tokio::time::timeout(deadline, task).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(deadline_secs = deadline.as_secs(), "Task deadline exceeded");
            Err(TaskError::DeadlineExceeded(deadline))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn stub_poll(
        pending_polls: u32,
        calls: Arc<AtomicU32>,
    ) -> impl FnMut(Operation) -> std::future::Ready<Result<Operation, ProviderError>> {
        move |op: Operation| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            let mut next = op;
            if n > pending_polls {
                next.done = true;
                next.result_uri = Some("https://example.com/video.mp4".to_string());
            }
            std::future::ready(Ok(next))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_exactly_n_plus_one_times() {
        for n in [0u32, 1, 5] {
            let calls = Arc::new(AtomicU32::new(0));
            let result = poll_until_done(
                Operation::pending("operations/x"),
                stub_poll(n, calls.clone()),
                Duration::from_secs(10),
            )
            .await
            .unwrap();

            assert!(result.done);
            assert_eq!(calls.load(Ordering::SeqCst), n + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_fixed_interval_between_polls() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = tokio::time::Instant::now();
        poll_until_done(
            Operation::pending("operations/x"),
            stub_poll(2, calls),
            Duration::from_secs(10),
        )
        .await
        .unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_done_is_not_polled() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut done = Operation::pending("operations/x");
        done.done = true;

        let result = poll_until_done(done.clone(), stub_poll(0, calls.clone()), Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(result, done);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_error_propagates_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = poll_until_done(
            Operation::pending("operations/x"),
            move |_op| {
                counter.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Err::<Operation, _>(ProviderError::new("poll failed")))
            },
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(result.unwrap_err().message, "poll failed");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires_on_endless_operation() {
        let never_done = poll_until_done(
            Operation::pending("operations/stuck"),
            |op: Operation| std::future::ready(Ok::<_, ProviderError>(op)),
            Duration::from_secs(10),
        );
        let result = with_deadline(Duration::from_secs(60), async {
            never_done.await.map_err(TaskError::from)
        })
        .await;

        assert_eq!(
            result.unwrap_err(),
            TaskError::DeadlineExceeded(Duration::from_secs(60))
        );
    }

    #[tokio::test]
    async fn test_deadline_passes_through_fast_results() {
        let result = with_deadline(Duration::from_secs(5), async { Ok::<_, TaskError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
