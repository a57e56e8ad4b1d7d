pub mod chain;
pub mod constants;
pub mod message;
pub mod sync;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub use chain::{Chain, ChainError, ValidationError};
pub use message::{Message, MessageError};
pub use sync::{PeerId, RejectReason, SyncEngine, SyncOutcome, Transport};

/// Hex-encoded SHA-256 digest.
pub type Hash = String;

/// Seconds since the Unix epoch. A clock before 1970 yields 0 rather than a panic.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Digest over `index ‖ previous_hash ‖ timestamp ‖ data`, in that order.
pub fn calc_hash(index: u64, previous_hash: &str, timestamp: u64, data: &str) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(index.to_string().as_bytes());
    hasher.update(previous_hash.as_bytes());
    hasher.update(timestamp.to_string().as_bytes());
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub previous_hash: Hash,
    pub timestamp: u64,
    pub data: String,
    pub hash: Hash,
}

impl Block {
    /// Build a block whose `hash` is derived from the other fields.
    pub fn new(index: u64, previous_hash: Hash, timestamp: u64, data: String) -> Self {
        let hash = calc_hash(index, &previous_hash, timestamp, &data);
        Self {
            index,
            previous_hash,
            timestamp,
            data,
            hash,
        }
    }

    /// Recompute the content hash from the block's own fields.
    pub fn compute_hash(&self) -> Hash {
        calc_hash(self.index, &self.previous_hash, self.timestamp, &self.data)
    }

    pub fn has_valid_hash(&self) -> bool {
        self.compute_hash() == self.hash
    }
}

/// The canonical first block, identical on every node.
pub fn genesis_block() -> Block {
    Block::new(
        0,
        "0".repeat(constants::HASH_HEX_SIZE),
        constants::GENESIS_TIMESTAMP,
        constants::GENESIS_DATA.to_string(),
    )
}
