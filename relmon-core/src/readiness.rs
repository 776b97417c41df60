//! Bounded readiness gate for the backing store.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{info, warn};

#[derive(Debug, Error)]
#[error("not ready after {attempts} checks over {waited:?}")]
pub struct ReadinessTimeout {
    pub attempts: u32,
    pub waited: Duration,
}

/// Polls `check` until it succeeds or `max_wait` elapses.
///
/// The first check fires immediately and failed checks repeat every
/// `check_interval`; checks are strictly sequential, never overlapping.
/// Returns as soon as one check succeeds. Total runtime is bounded by
/// `max_wait` plus one final check interval.
pub async fn await_ready<F, Fut, E>(
    mut check: F,
    check_interval: Duration,
    max_wait: Duration,
) -> Result<(), ReadinessTimeout>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: fmt::Display,
{
    let started = Instant::now();
    let deadline = started + max_wait;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match check().await {
            Ok(()) => {
                info!(attempts, "dependency ready");
                return Ok(());
            }
            Err(error) => {
                warn!(%error, attempt = attempts, "dependency check failed")
            }
        }

        if Instant::now() >= deadline {
            return Err(ReadinessTimeout {
                attempts,
                waited: started.elapsed(),
            });
        }
        sleep(check_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    const INTERVAL: Duration = Duration::from_secs(15);
    const MAX_WAIT: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn succeeds_immediately_without_waiting() {
        let started = Instant::now();

        await_ready(|| async { Ok::<(), &str>(()) }, INTERVAL, MAX_WAIT)
            .await
            .expect("ready on first check");

        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_on_the_interval_until_success() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let started = Instant::now();

        await_ready(
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("connection refused")
                    } else {
                        Ok(())
                    }
                }
            },
            INTERVAL,
            MAX_WAIT,
        )
        .await
        .expect("ready on third check");

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // Success on the third check means exactly two full waits, with no
        // trailing delay after the successful check.
        assert_eq!(started.elapsed(), INTERVAL * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_the_store_never_answers() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let started = Instant::now();

        let error = await_ready(
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("connection refused")
                }
            },
            INTERVAL,
            MAX_WAIT,
        )
        .await
        .expect_err("never becomes ready");

        // Checks at 0s, 15s, 30s, 45s and 60s; the deadline stops the loop
        // before a sixth attempt.
        assert_eq!(error.attempts, 5);
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
        assert_eq!(started.elapsed(), MAX_WAIT);
    }
}
