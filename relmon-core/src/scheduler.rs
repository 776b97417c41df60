//! Fixed-delay periodic execution.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::metrics::{OUTCOME_FAILURE, OUTCOME_SUCCESS, ServiceMetrics};

/// Runs `task` forever on a fixed delay until `shutdown` fires.
///
/// Scheduling is fixed-delay with a sliding timer: each wait is a full
/// `period` measured from the previous run's completion, with no drift
/// correction. The first run fires immediately.
///
/// Cancellation is checked before each run and interrupts an in-progress
/// wait; a running task is always allowed to finish. A token already
/// cancelled on entry means zero runs. Task failures are logged and
/// swallowed; the next tick is the implicit retry.
pub async fn run_periodic<F, Fut>(
    name: &str,
    period: Duration,
    shutdown: CancellationToken,
    metrics: Arc<ServiceMetrics>,
    mut task: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = crate::error::Result<()>>,
{
    info!(task = name, period_secs = period.as_secs(), "scheduler started");

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        let started = Instant::now();
        match task().await {
            Ok(()) => {
                let elapsed = started.elapsed();
                metrics.observe_run(OUTCOME_SUCCESS, elapsed);
                info!(
                    task = name,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "run finished"
                );
            }
            Err(err) => {
                metrics.observe_run(OUTCOME_FAILURE, started.elapsed());
                error!(task = name, error = %err, "run failed");
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = sleep(period) => {}
        }
    }

    info!(task = name, "scheduler stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use prometheus::Registry;

    use super::*;
    use crate::error::RelmonError;

    const PERIOD: Duration = Duration::from_secs(300);

    fn test_metrics() -> Arc<ServiceMetrics> {
        let registry = Registry::new();
        Arc::new(
            ServiceMetrics::register(&registry).expect("register collectors"),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn a_cancelled_token_means_zero_runs() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let runs = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&runs);

        run_periodic("test", PERIOD, shutdown, test_metrics(), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_are_separated_by_a_full_period() {
        let shutdown = CancellationToken::new();
        let starts: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));

        let token = shutdown.clone();
        let recorded = Arc::clone(&starts);
        run_periodic("test", PERIOD, shutdown, test_metrics(), move || {
            let token = token.clone();
            let recorded = Arc::clone(&recorded);
            async move {
                let mut starts = recorded.lock().expect("starts lock");
                starts.push(Instant::now());
                if starts.len() == 3 {
                    token.cancel();
                }
                Ok(())
            }
        })
        .await;

        let starts = starts.lock().expect("starts lock");
        assert_eq!(starts.len(), 3);
        assert_eq!(starts[1] - starts[0], PERIOD);
        assert_eq!(starts[2] - starts[1], PERIOD);
    }

    #[tokio::test(start_paused = true)]
    async fn a_failing_run_does_not_stop_the_loop() {
        let shutdown = CancellationToken::new();
        let metrics = test_metrics();
        let runs = Arc::new(AtomicU32::new(0));

        let token = shutdown.clone();
        let counter = Arc::clone(&runs);
        run_periodic(
            "test",
            PERIOD,
            shutdown,
            Arc::clone(&metrics),
            move || {
                let token = token.clone();
                let counter = Arc::clone(&counter);
                async move {
                    match counter.fetch_add(1, Ordering::SeqCst) {
                        0 => Err(RelmonError::Internal("boom".to_string())),
                        _ => {
                            token.cancel();
                            Ok(())
                        }
                    }
                }
            },
        )
        .await;

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(
            metrics.runs.with_label_values(&["failure"]).get(),
            1
        );
        assert_eq!(
            metrics.runs.with_label_values(&["success"]).get(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_wait() {
        let shutdown = CancellationToken::new();
        let runs = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&runs);
        let token = shutdown.clone();
        let handle = tokio::spawn(run_periodic(
            "test",
            PERIOD,
            token,
            test_metrics(),
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        ));

        // Let the first run complete and the scheduler enter its wait,
        // then cancel mid-wait.
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        shutdown.cancel();
        handle.await.expect("scheduler task join");

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
