use crate::{genesis_block, now_secs, Block, Hash};
use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

/// Why a block cannot follow its predecessor. Variants are listed in the order
/// the rules are checked.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("index mismatch: expected {expected}, got {got}")]
    IndexMismatch { expected: u64, got: u64 },
    #[error("previous hash does not match predecessor")]
    PrevHashMismatch,
    #[error("block hash does not match its contents")]
    HashMismatch,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("chain is empty")]
    Empty,
    #[error("genesis block does not match the canonical genesis")]
    GenesisMismatch,
    #[error("invalid block at position {position}: {source}")]
    InvalidLink {
        position: usize,
        #[source]
        source: ValidationError,
    },
    #[error("candidate chain of length {candidate} is not longer than {local}")]
    NotLonger { candidate: usize, local: usize },
}

/// Check `block` against `prev` in rule order: index, previous hash, content hash.
pub fn validate_link(prev: &Block, block: &Block) -> Result<(), ValidationError> {
    validate_link_with_hash(prev, block, &block.compute_hash())
}

fn validate_link_with_hash(
    prev: &Block,
    block: &Block,
    recomputed: &Hash,
) -> Result<(), ValidationError> {
    let expected = prev.index + 1;
    if block.index != expected {
        return Err(ValidationError::IndexMismatch {
            expected,
            got: block.index,
        });
    }
    if block.previous_hash != prev.hash {
        return Err(ValidationError::PrevHashMismatch);
    }
    if *recomputed != block.hash {
        return Err(ValidationError::HashMismatch);
    }
    Ok(())
}

/// Validate a standalone sequence from its own genesis to its end, without
/// reference to any local chain.
pub fn is_valid_chain(candidate: &[Block]) -> Result<(), ChainError> {
    let first = candidate.first().ok_or(ChainError::Empty)?;
    if *first != genesis_block() {
        return Err(ChainError::GenesisMismatch);
    }

    // Hashing dominates the cost, so recompute in parallel and walk the links in order.
    let recomputed: Vec<Hash> = candidate.par_iter().map(Block::compute_hash).collect();

    for (position, pair) in candidate.windows(2).enumerate() {
        let position = position + 1;
        validate_link_with_hash(&pair[0], &pair[1], &recomputed[position])
            .map_err(|source| ChainError::InvalidLink { position, source })?;
    }
    Ok(())
}

/// The locally held chain. Never empty: it starts at the canonical genesis and
/// only grows by validated append or wholesale replacement.
#[derive(Clone, Debug)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    pub fn new() -> Self {
        Self {
            blocks: vec![genesis_block()],
        }
    }

    /// The tip. The chain always holds at least the genesis block.
    pub fn latest(&self) -> &Block {
        self.blocks
            .last()
            .unwrap_or_else(|| unreachable!("chain always holds the genesis block"))
    }

    pub fn genesis(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Build the block that would extend the current tip. Does not mutate.
    pub fn propose_next(&self, data: impl Into<String>) -> Block {
        let tip = self.latest();
        Block::new(tip.index + 1, tip.hash.clone(), now_secs(), data.into())
    }

    /// Append `block` if it extends the tip; the chain is unchanged on error.
    pub fn try_append(&mut self, block: Block) -> Result<(), ValidationError> {
        validate_link(self.latest(), &block)?;
        debug!(index = block.index, hash = %block.hash, "appending block");
        self.blocks.push(block);
        Ok(())
    }

    /// Swap in `candidate` wholesale if it is valid and strictly longer.
    pub fn replace(&mut self, candidate: Vec<Block>) -> Result<(), ChainError> {
        if candidate.len() <= self.blocks.len() {
            return Err(ChainError::NotLonger {
                candidate: candidate.len(),
                local: self.blocks.len(),
            });
        }
        is_valid_chain(&candidate)?;
        debug!(from = self.blocks.len(), to = candidate.len(), "replacing chain");
        self.blocks = candidate;
        Ok(())
    }
}
