//! # Relmon Server
//!
//! Readiness-gated periodic reconciliation service backed by MySQL.
//!
//! ## Overview
//!
//! Startup blocks until the backing store answers a ping, provisions the
//! per-architecture release and result tables if absent, then hands control
//! to a fixed-delay reconcile loop that runs until the process is told to
//! stop. A prometheus scrape endpoint runs alongside the main flow.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relmon_server::supervisor::{self, Options};

#[derive(Parser, Debug)]
#[command(name = "relmon-server")]
#[command(
    about = "Readiness-gated periodic reconciliation service backed by MySQL"
)]
struct Cli {
    /// Perform no mutating actions (reserved; currently inert)
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Address to serve metrics on; an empty value disables the endpoint
    #[arg(long, env = "RELMON_LISTEN", default_value = "0.0.0.0:8080")]
    listen: String,

    /// Raise log verbosity (-v: debug, -vv: trace); RUST_LOG wins when set
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file = match dotenvy::dotenv() {
        Ok(path) => Some(path),
        Err(err) if err.not_found() => None,
        Err(err) => return Err(err).context("failed to load .env file"),
    };

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(path) = env_file {
        info!(path = %path.display(), "loaded .env file");
    }

    supervisor::run(Options {
        dry_run: cli.dry_run,
        listen: cli.listen,
    })
    .await
}

fn init_tracing(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
