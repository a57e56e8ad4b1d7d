use crate::constants::{DEFAULT_HTTP_PORT, DEFAULT_P2P_PORT};
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[derive(Parser, Debug, Clone)]
#[command(name = "ledger-node")]
#[command(about = "Peer-to-peer ledger node")]
pub struct NodeConfig {
    /// Address the HTTP and P2P listeners bind to
    #[arg(long, env = "BIND_ADDR", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub bind: IpAddr,

    /// Port of the HTTP control plane
    #[arg(long, env = "HTTP_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub http_port: u16,

    /// Port of the WebSocket peer listener
    #[arg(long, env = "P2P_PORT", default_value_t = DEFAULT_P2P_PORT)]
    pub p2p_port: u16,

    /// Comma-separated peers to dial at startup, e.g. ws://127.0.0.1:6974
    #[arg(long, env = "PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            http_port: DEFAULT_HTTP_PORT,
            p2p_port: DEFAULT_P2P_PORT,
            peers: Vec::new(),
        }
    }
}

impl NodeConfig {
    /// Config bound to loopback with OS-assigned ports.
    pub fn ephemeral() -> Self {
        Self {
            http_port: 0,
            p2p_port: 0,
            ..Self::default()
        }
    }

    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.http_port)
    }

    pub fn p2p_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.p2p_port)
    }
}
