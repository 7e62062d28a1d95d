//! Orion bridge daemon
//!
//! Polls a Columbia Weather Systems MicroServer for its enhanced XML
//! document, normalizes the readings, and writes one JSON record per cycle
//! to stdout for the downstream recorder.

mod sink;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use orion_config::BridgeConfig;
use orion_ingest::{PollConfig, Poller, StationClient};

use crate::sink::StdoutSink;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,orion_ingest=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting Orion bridge");

    let config = BridgeConfig::load().context("failed to load configuration")?;
    info!(
        host = %config.station.host,
        port = config.station.port,
        interval_secs = config.poll.interval_secs,
        target = ?config.units.target,
        "configuration loaded"
    );

    let client = StationClient::new(
        &config.station.host,
        config.station.port,
        config.request_timeout(),
    )
    .context("invalid station endpoint")?;
    info!(url = %client.url(), "station endpoint resolved");

    let poll_config = PollConfig {
        poll_interval: config.poll_interval(),
        max_tries: config.poll.max_tries,
        retry_wait: config.retry_wait(),
        request_timeout: config.request_timeout(),
    };

    let (poller, handle) = Poller::new(client, poll_config, config.units.target, StdoutSink::new());

    info!("bridge running - press Ctrl+C to stop");

    let poll_task = tokio::spawn(poller.run());
    shutdown_signal().await;
    info!("shutdown signal received");
    handle.stop();
    poll_task.await.context("poller task panicked")?;

    info!("Orion bridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install signal handler");
}
