use ledger_core::{Message, PeerId, Transport};
use std::collections::BTreeMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};

/// Write side of one live connection.
#[derive(Debug)]
pub struct PeerHandle {
    pub addr: String,
    outbox: mpsc::Sender<String>,
}

/// The set of connected peers. Owned by the node event loop, which is the only
/// place it is mutated.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: BTreeMap<PeerId, PeerHandle>,
}

impl PeerRegistry {
    pub fn insert(&mut self, peer: PeerId, addr: String, outbox: mpsc::Sender<String>) {
        self.peers.insert(peer, PeerHandle { addr, outbox });
    }

    /// Dropping the handle closes the outbox, which ends the connection's writer.
    pub fn remove(&mut self, peer: PeerId) -> Option<PeerHandle> {
        self.peers.remove(&peer)
    }

    pub fn contains(&self, peer: PeerId) -> bool {
        self.peers.contains_key(&peer)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn addresses(&self) -> Vec<String> {
        self.peers.values().map(|p| p.addr.clone()).collect()
    }

    fn deliver(peer: PeerId, handle: &PeerHandle, frame: String) {
        match handle.outbox.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!(%peer, "outbox full, dropping message"),
            Err(TrySendError::Closed(_)) => debug!(%peer, "connection closed, dropping message"),
        }
    }
}

impl Transport for PeerRegistry {
    fn send(&self, peer: PeerId, message: &Message) {
        let Some(handle) = self.peers.get(&peer) else {
            debug!(%peer, "send to unknown peer ignored");
            return;
        };
        match message.encode() {
            Ok(frame) => Self::deliver(peer, handle, frame),
            Err(e) => error!(%peer, error = %e, "failed to encode message"),
        }
    }

    fn broadcast(&self, message: &Message) {
        let frame = match message.encode() {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "failed to encode broadcast");
                return;
            }
        };
        for (peer, handle) in &self.peers {
            Self::deliver(*peer, handle, frame.clone());
        }
    }
}
