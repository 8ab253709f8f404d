//! mcp-probe - visual-test probe for MCP tool servers.
//!
//! This is the main entry point for the probe binary. It spawns the MCP
//! server subprocess, runs the fixed test sequence against it under a
//! global timeout, and exits 0 only if every step succeeded.

use anyhow::{anyhow, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mcp_probe::config::ProbeConfig;
use mcp_probe::harness::Harness;
use mcp_probe::rpc::RpcClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "mcp_probe=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    info!("Starting mcp-probe v{}", env!("CARGO_PKG_VERSION"));

    let config = ProbeConfig::from_env();
    let run_timeout = config.run_timeout;

    let mut client = RpcClient::spawn(&config).map_err(|e| {
        error!("Failed to launch MCP server: {}", e);
        e
    })?;
    client.set_timeout(config.request_timeout);

    let mut harness = Harness::new(client, config.clone());

    // The whole run is bounded by one outer timer, independent of the
    // per-request windows
    let outcome = tokio::time::timeout(run_timeout, harness.run()).await;

    // The subprocess is terminated on every exit path
    harness.shutdown().await;

    match outcome {
        Ok(Ok(report)) => {
            info!("Visual testing complete");
            info!("Generated files:");
            info!("  - {}", config.dom_snapshot_path.display());
            if report.screenshot_saved {
                info!("  - {}", config.screenshot_path.display());
            }
            Ok(())
        }
        Ok(Err(e)) => {
            error!("Test failed: {:#}", e);
            Err(e)
        }
        Err(_) => {
            let e = anyhow!("tests timed out after {}s", run_timeout.as_secs());
            error!("{}", e);
            Err(e)
        }
    }
}
