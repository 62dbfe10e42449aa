use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use hue_exporter::bridge::Bridge;
use hue_exporter::collector::GathererBuilder;
use hue_exporter::config::BridgeConfig;
use hue_exporter::{logging, metrics, server};

#[derive(Parser)]
#[command(name = "hue_exporter")]
#[command(about = "Prometheus exporter for Philips Hue bridge state")]
#[command(version = "0.1.0")]
struct Cli {
    /// Port for Prometheus metrics to be served on
    #[arg(long, default_value_t = 8080)]
    metric_port: u16,

    /// Seconds between collection cycles
    #[arg(long, default_value_t = 5)]
    tick_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();

    // Recorder install failure is fatal: without it there is nothing to
    // scrape.
    let handle = metrics::install()?;

    let bridge = Bridge::new(&BridgeConfig::from_env());
    let gatherer = Arc::new(
        GathererBuilder::new()
            .with_bridge(bridge)
            .with_exporter(handle)
            .with_interval(Duration::from_secs(cli.tick_seconds))
            .build()?,
    );

    // Serve scrape traffic; on failure keep retrying the bind.
    let scrape = Arc::clone(&gatherer);
    let metric_port = cli.metric_port;
    tokio::spawn(async move {
        loop {
            if let Err(e) = server::start_server(Arc::clone(&scrape), metric_port).await {
                error!(error = %e, "fell out of serving HTTP traffic");
            }

            tokio::time::sleep(Duration::from_secs(10)).await;
        }
    });

    // Ctrl-C cancels the collection loop for a clean exit.
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    info!("Starting metric collector");
    gatherer.run(cancel).await?;

    Ok(())
}
