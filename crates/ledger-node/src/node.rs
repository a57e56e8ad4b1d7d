//! The node event loop.
//!
//! Every mutation of the chain or the peer set happens here, one event at a
//! time. Connection tasks and the control plane only submit events; reads go
//! through snapshots published after each event.
use crate::constants::EVENT_QUEUE_CAPACITY;
use crate::peers::PeerRegistry;
use crate::transport::PeerNetwork;
use anyhow::{anyhow, Result};
use ledger_core::{Block, Chain, PeerId, SyncEngine, SyncOutcome};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

pub enum Event {
    Connected {
        peer: PeerId,
        addr: String,
        outbox: mpsc::Sender<String>,
    },
    Message {
        peer: PeerId,
        raw: String,
    },
    Disconnected {
        peer: PeerId,
    },
    Mine {
        data: String,
        reply: oneshot::Sender<Block>,
    },
}

pub struct Node {
    engine: SyncEngine,
    registry: PeerRegistry,
    events: mpsc::Receiver<Event>,
    chain_tx: watch::Sender<Arc<Vec<Block>>>,
    peers_tx: watch::Sender<Arc<Vec<String>>>,
}

impl Node {
    pub fn new(chain: Chain) -> (Self, NodeHandle) {
        let (events_tx, events) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (chain_tx, chain_rx) = watch::channel(Arc::new(chain.blocks().to_vec()));
        let (peers_tx, peers_rx) = watch::channel(Arc::new(Vec::new()));

        let node = Self {
            engine: SyncEngine::new(chain),
            registry: PeerRegistry::default(),
            events,
            chain_tx,
            peers_tx,
        };
        let handle = NodeHandle {
            network: PeerNetwork::new(events_tx.clone()),
            events: events_tx,
            chain: chain_rx,
            peers: peers_rx,
        };
        (node, handle)
    }

    /// Process events until every sender is gone.
    pub async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            self.handle(event);
        }
        info!("event queue closed, node stopped");
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Connected { peer, addr, outbox } => {
                info!(%peer, %addr, "peer connected");
                self.registry.insert(peer, addr, outbox);
                self.publish_peers();
                self.engine.on_peer_connected(peer, &self.registry);
            }
            Event::Disconnected { peer } => {
                if self.registry.remove(peer).is_some() {
                    info!(%peer, "peer disconnected");
                    self.publish_peers();
                }
            }
            Event::Message { peer, raw } => {
                if !self.registry.contains(peer) {
                    debug!(%peer, "dropping message from removed peer");
                    return;
                }
                let outcome = self.engine.on_raw_message(peer, &raw, &self.registry);
                debug!(%peer, ?outcome, "handled peer message");
                if matches!(outcome, SyncOutcome::Appended | SyncOutcome::Replaced) {
                    self.publish_chain();
                }
            }
            Event::Mine { data, reply } => {
                let block = self.engine.on_local_mine(data, &self.registry);
                self.publish_chain();
                // The requester may have given up; the block stays mined either way.
                let _ = reply.send(block);
            }
        }
    }

    fn publish_chain(&self) {
        self.chain_tx
            .send_replace(Arc::new(self.engine.chain().blocks().to_vec()));
    }

    fn publish_peers(&self) {
        self.peers_tx
            .send_replace(Arc::new(self.registry.addresses()));
    }
}

/// Cloneable control-plane access to a running [`Node`].
#[derive(Clone)]
pub struct NodeHandle {
    events: mpsc::Sender<Event>,
    chain: watch::Receiver<Arc<Vec<Block>>>,
    peers: watch::Receiver<Arc<Vec<String>>>,
    network: PeerNetwork,
}

impl NodeHandle {
    /// Mine `data` into a new block and announce it to all peers.
    pub async fn mine(&self, data: String) -> Result<Block> {
        let (reply, rx) = oneshot::channel();
        self.events
            .send(Event::Mine { data, reply })
            .await
            .map_err(|_| anyhow!("node is not running"))?;
        rx.await.map_err(|_| anyhow!("node stopped before mining"))
    }

    /// Consistent snapshot of the chain as of the last processed event.
    pub fn blocks(&self) -> Arc<Vec<Block>> {
        self.chain.borrow().clone()
    }

    pub fn latest(&self) -> Option<Block> {
        self.chain.borrow().last().cloned()
    }

    pub fn peers(&self) -> Arc<Vec<String>> {
        self.peers.borrow().clone()
    }

    pub async fn add_peer(&self, address: &str) -> Result<PeerId> {
        self.network.connect(address).await
    }

    pub async fn listen(&self, addr: SocketAddr) -> Result<SocketAddr> {
        self.network.listen(addr).await
    }
}
