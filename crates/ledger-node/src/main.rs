use clap::Parser;
use ledger_node::config::NodeConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = NodeConfig::parse();
    let running = ledger_node::spawn(&config).await?;
    info!(
        http = %running.http_addr,
        p2p = %running.p2p_addr,
        "node started"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}
