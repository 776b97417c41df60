//! Prometheus collectors for the service.
//!
//! Collectors are registered against an explicit [`Registry`] owned by the
//! supervisor rather than the process-global default, so tests can build
//! isolated instances.

use std::fmt;
use std::time::Duration;

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry,
    TextEncoder,
};

pub const OUTCOME_SUCCESS: &str = "success";
pub const OUTCOME_FAILURE: &str = "failure";

/// Counters and histograms observing the startup sequence and the
/// reconcile loop.
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Readiness checks against the backing store, by outcome.
    pub readiness_checks: IntCounterVec,

    /// Schema bootstrap invocations, by outcome.
    pub bootstrap_runs: IntCounterVec,

    /// Reconcile runs, by outcome.
    pub runs: IntCounterVec,

    /// Reconcile run duration.
    pub run_duration_seconds: Histogram,
}

impl fmt::Debug for ServiceMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceMetrics").finish_non_exhaustive()
    }
}

impl ServiceMetrics {
    /// Create the collectors and register them with `registry`.
    pub fn register(registry: &Registry) -> prometheus::Result<Self> {
        let readiness_checks = IntCounterVec::new(
            Opts::new(
                "relmon_readiness_checks_total",
                "Readiness checks against the backing store",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(readiness_checks.clone()))?;

        let bootstrap_runs = IntCounterVec::new(
            Opts::new(
                "relmon_schema_bootstrap_total",
                "Schema bootstrap invocations",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(bootstrap_runs.clone()))?;

        let runs = IntCounterVec::new(
            Opts::new("relmon_reconcile_runs_total", "Reconcile runs"),
            &["outcome"],
        )?;
        registry.register(Box::new(runs.clone()))?;

        let run_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "relmon_reconcile_run_duration_seconds",
                "Duration of reconcile runs",
            )
            .buckets(vec![0.01, 0.1, 0.5, 1.0, 5.0, 30.0, 60.0, 300.0]),
        )?;
        registry.register(Box::new(run_duration_seconds.clone()))?;

        Ok(ServiceMetrics {
            readiness_checks,
            bootstrap_runs,
            runs,
            run_duration_seconds,
        })
    }

    pub fn observe_run(&self, outcome: &str, elapsed: Duration) {
        self.runs.with_label_values(&[outcome]).inc();
        self.run_duration_seconds.observe(elapsed.as_secs_f64());
    }
}

/// Render `registry` in the prometheus text exposition format.
pub fn encode_text(registry: &Registry) -> prometheus::Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|error| prometheus::Error::Msg(error.to_string()))
}
