//! Process supervision: the ordered startup sequence and the steady-state
//! reconcile loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use prometheus::Registry;
use relmon_core::{
    MysqlDatabase, ServiceMetrics, Settings,
    metrics::{OUTCOME_FAILURE, OUTCOME_SUCCESS},
    readiness, reconcile, schema, scheduler,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::metrics_http;

/// Interval between readiness checks during startup.
const READY_CHECK_INTERVAL: Duration = Duration::from_secs(15);

/// Total time the startup sequence waits for the backing store.
const READY_MAX_WAIT: Duration = Duration::from_secs(60);

/// Spacing of reconcile runs.
const RECONCILE_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct Options {
    /// Reserved for suppressing mutating actions; parsed and carried but
    /// not yet honored by any code path.
    pub dry_run: bool,

    /// Bind address for the metrics endpoint; empty disables it.
    pub listen: String,
}

/// Runs the service: metrics endpoint, readiness gate, schema bootstrap,
/// then the reconcile loop until a shutdown signal arrives.
///
/// Startup failures (configuration, readiness timeout, bind errors) abort
/// the process. A bootstrap failure is logged and the service continues
/// with a partially provisioned store.
pub async fn run(options: Options) -> anyhow::Result<()> {
    info!(dry_run = options.dry_run, "starting");

    let settings =
        Settings::from_env().context("incomplete environment configuration")?;

    let registry = Arc::new(Registry::new());
    let metrics = Arc::new(
        ServiceMetrics::register(&registry)
            .context("failed to register metrics collectors")?,
    );

    if !options.listen.is_empty() {
        serve_metrics(&options.listen, Arc::clone(&registry)).await?;
    }

    let elevated = MysqlDatabase::connect_lazy(&settings.elevated_target());
    let restricted =
        MysqlDatabase::connect_lazy(&settings.restricted_target());

    info!(target = %restricted.target(), "checking access to backing store");
    {
        let checks = &metrics.readiness_checks;
        let db = &restricted;
        readiness::await_ready(
            || {
                let checks = checks.clone();
                async move {
                    match db.ping().await {
                        Ok(()) => {
                            checks
                                .with_label_values(&[OUTCOME_SUCCESS])
                                .inc();
                            Ok(())
                        }
                        Err(err) => {
                            checks
                                .with_label_values(&[OUTCOME_FAILURE])
                                .inc();
                            Err(err)
                        }
                    }
                }
            },
            READY_CHECK_INTERVAL,
            READY_MAX_WAIT,
        )
        .await
        .with_context(|| {
            format!("backing store {} unreachable", restricted.target())
        })?;
    }

    match schema::ensure_schema(&elevated, &settings.variant).await {
        Ok(()) => {
            metrics
                .bootstrap_runs
                .with_label_values(&[OUTCOME_SUCCESS])
                .inc();
        }
        Err(err) => {
            // Provisioning is best-effort-once: remaining objects were
            // skipped and the loop starts against a partial schema.
            metrics
                .bootstrap_runs
                .with_label_values(&[OUTCOME_FAILURE])
                .inc();
            error!(error = %err, "schema bootstrap incomplete, continuing");
        }
    }

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    let db = restricted.clone();
    scheduler::run_periodic(
        "reconcile",
        RECONCILE_INTERVAL,
        shutdown,
        Arc::clone(&metrics),
        move || {
            let db = db.clone();
            async move { reconcile::reconcile(&db).await }
        },
    )
    .await;

    info!("exiting");
    Ok(())
}

/// Binds the scrape endpoint and serves it on a supervised background
/// task. Bind errors are fatal; errors after startup are reported through
/// tracing and the reconcile loop keeps running without a scrape surface.
async fn serve_metrics(
    listen: &str,
    registry: Arc<Registry>,
) -> anyhow::Result<()> {
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("invalid listen address `{listen}`"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind metrics endpoint on {addr}"))?;
    info!(%addr, "metrics endpoint listening");

    tokio::spawn(async move {
        if let Err(err) =
            axum::serve(listener, metrics_http::router(registry)).await
        {
            error!(error = %err, "metrics endpoint terminated");
        }
    });

    Ok(())
}

/// Cancels `shutdown` once when the process receives a termination signal.
fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            }
        }
        Err(err) => {
            // Without a handler the process can still be killed externally;
            // never resolve so the loop keeps running.
            error!(error = %err, "failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("received interrupt, shutting down");
    } else {
        error!("failed to await interrupt signal");
        std::future::pending::<()>().await;
    }
}
