//! Longest-valid-chain reconciliation and the query/response gossip protocol.
//!
//! The engine owns the local [`Chain`] and is driven one event at a time by its
//! caller. It never talks to sockets directly: replies and announcements go out
//! through a [`Transport`] supplied with each event.
use crate::chain::{is_valid_chain, ChainError, ValidationError};
use crate::{Block, Chain, Message};
use std::fmt;
use tracing::{debug, info, warn};

/// Identifier the transport assigns to a live connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Outbound side of the peer layer. Sends are fire-and-forget; delivery
/// failures are the transport's concern and never reach the engine.
pub trait Transport {
    fn send(&self, peer: PeerId, message: &Message);
    fn broadcast(&self, message: &Message);
}

/// What handling one event did. Useful for logging and tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Answered a query.
    Replied,
    /// Received data was not ahead of our tip.
    NotNewer,
    /// Single block appended to our tip.
    Appended,
    /// Asked the sender for its full chain.
    RequestedFullChain,
    /// Local chain replaced by the received one.
    Replaced,
    /// Received data was invalid or not longer.
    Rejected(RejectReason),
    /// Frame could not be decoded.
    Malformed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    Block(ValidationError),
    Chain(ChainError),
}

#[derive(Debug, Default)]
pub struct SyncEngine {
    chain: Chain,
}

impl SyncEngine {
    pub fn new(chain: Chain) -> Self {
        Self { chain }
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    fn latest_message(&self) -> Message {
        Message::ChainData(vec![self.chain.latest().clone()])
    }

    fn full_chain_message(&self) -> Message {
        Message::ChainData(self.chain.blocks().to_vec())
    }

    /// Mine `data` on top of our tip and announce the new block.
    pub fn on_local_mine(&mut self, data: impl Into<String>, transport: &impl Transport) -> Block {
        let block = self.chain.propose_next(data);
        if let Err(e) = self.chain.try_append(block.clone()) {
            // A block proposed against our own tip always links to it.
            unreachable!("locally proposed block rejected: {e}");
        }
        info!(index = block.index, hash = %block.hash, "mined block");
        transport.broadcast(&self.latest_message());
        block
    }

    /// Pull-based bootstrap: learn the new peer's height.
    pub fn on_peer_connected(&mut self, peer: PeerId, transport: &impl Transport) {
        debug!(%peer, "querying latest block from new peer");
        transport.send(peer, &Message::QueryLatest);
    }

    /// Decode a raw frame and dispatch it. Malformed input is dropped.
    pub fn on_raw_message(
        &mut self,
        peer: PeerId,
        raw: &str,
        transport: &impl Transport,
    ) -> SyncOutcome {
        match Message::decode(raw) {
            Ok(message) => self.on_peer_message(peer, message, transport),
            Err(e) => {
                warn!(%peer, error = %e, "dropping malformed message");
                SyncOutcome::Malformed
            }
        }
    }

    pub fn on_peer_message(
        &mut self,
        peer: PeerId,
        message: Message,
        transport: &impl Transport,
    ) -> SyncOutcome {
        match message {
            Message::QueryLatest => {
                transport.send(peer, &self.latest_message());
                SyncOutcome::Replied
            }
            Message::QueryAll => {
                transport.send(peer, &self.full_chain_message());
                SyncOutcome::Replied
            }
            Message::ChainData(blocks) => self.reconcile(peer, blocks, transport),
        }
    }

    fn reconcile(
        &mut self,
        peer: PeerId,
        mut received: Vec<Block>,
        transport: &impl Transport,
    ) -> SyncOutcome {
        received.sort_by_key(|b| b.index);
        let Some(theirs) = received.last() else {
            return SyncOutcome::Rejected(RejectReason::Chain(ChainError::Empty));
        };
        let ours = self.chain.latest();

        if theirs.index <= ours.index {
            debug!(%peer, theirs = theirs.index, ours = ours.index, "received chain is not newer");
            return SyncOutcome::NotNewer;
        }

        info!(%peer, theirs = theirs.index, ours = ours.index, "peer is ahead of us");

        if received.len() == 1 {
            if theirs.previous_hash != ours.hash {
                debug!(%peer, "missing intermediate blocks, requesting full chain");
                transport.send(peer, &Message::QueryAll);
                return SyncOutcome::RequestedFullChain;
            }
            let block = received.swap_remove(0);
            return match self.chain.try_append(block) {
                Ok(()) => {
                    transport.broadcast(&self.latest_message());
                    SyncOutcome::Appended
                }
                Err(e) => {
                    warn!(%peer, reason = %e, "rejected announced block");
                    SyncOutcome::Rejected(RejectReason::Block(e))
                }
            };
        }

        if let Err(e) = is_valid_chain(&received) {
            warn!(%peer, reason = %e, "rejected received chain");
            return SyncOutcome::Rejected(RejectReason::Chain(e));
        }
        match self.chain.replace(received) {
            Ok(()) => {
                info!(%peer, len = self.chain.len(), "replaced local chain");
                transport.broadcast(&self.latest_message());
                SyncOutcome::Replaced
            }
            Err(e) => {
                debug!(%peer, reason = %e, "kept local chain");
                SyncOutcome::Rejected(RejectReason::Chain(e))
            }
        }
    }
}
