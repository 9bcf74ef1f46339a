//! Serves the simulated boats API.
//!
//! Environment:
//! - `FLAKY_BOATS_ADDR` listen address, default `127.0.0.1:3000`
//! - `FLAKY_BOATS_SEED` optional RNG seed for reproducible runs
//! - `FLAKY_BOATS_*` delay and error settings, see `SimulatorConfig::from_env`
//! - `RUST_LOG` log filter, default `info`

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use riverport_boats::simulator::{self, BoatStore, FlakyUpstream, RandomFaults, SimulatorConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = SimulatorConfig::from_env().context("invalid simulator configuration")?;
    let addr: SocketAddr = std::env::var("FLAKY_BOATS_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_owned())
        .parse()
        .context("FLAKY_BOATS_ADDR must be a socket address")?;

    let faults = match std::env::var("FLAKY_BOATS_SEED") {
        Ok(seed) => {
            let seed = seed
                .trim()
                .parse::<u64>()
                .context("FLAKY_BOATS_SEED must be an unsigned integer")?;
            RandomFaults::seeded(config.clone(), seed)?
        }
        Err(_) => RandomFaults::new(config.clone())?,
    };
    let upstream = FlakyUpstream::new(BoatStore::seeded(), Arc::new(faults));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, ?config, "flaky boats upstream listening");

    axum::serve(listener, simulator::router(upstream))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("boats upstream server failed")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
