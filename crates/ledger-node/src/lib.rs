pub mod config;
pub mod constants;
pub mod http;
pub mod node;
pub mod peers;
pub mod transport;

use anyhow::{Context, Result};
use config::NodeConfig;
use ledger_core::Chain;
use node::{Node, NodeHandle};
use std::net::SocketAddr;
use tracing::{error, info, warn};

/// A node whose event loop, listeners and HTTP server are running.
pub struct RunningNode {
    pub handle: NodeHandle,
    pub http_addr: SocketAddr,
    pub p2p_addr: SocketAddr,
}

/// Start the event loop, the peer listener and the HTTP control plane, then
/// dial the configured peers. Failed dials are logged, not fatal.
pub async fn spawn(config: &NodeConfig) -> Result<RunningNode> {
    let (node, handle) = Node::new(Chain::new());
    tokio::spawn(node.run());

    let p2p_addr = handle.listen(config.p2p_addr()).await?;

    let listener = tokio::net::TcpListener::bind(config.http_addr())
        .await
        .with_context(|| format!("binding http listener on {}", config.http_addr()))?;
    let http_addr = listener.local_addr()?;
    let app = http::router(handle.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "http server stopped");
        }
    });
    info!("ledger-node listening on http://{http_addr}");

    for peer in &config.peers {
        if let Err(e) = handle.add_peer(peer).await {
            warn!(%peer, error = %e, "initial peer unreachable");
        }
    }

    Ok(RunningNode {
        handle,
        http_addr,
        p2p_addr,
    })
}
