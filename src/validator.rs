//! Block validation against the canonical hash list

use crate::block_file_reader::RawBlock;
use crate::block_hash::block_hash_hex;
use crate::hash_index::HashIndex;

/// Outcome of checking one block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Block is on the canonical chain
    Accepted(String),
    /// Orphan/fork block, or simply not in the list
    Rejected(String),
}

impl Verdict {
    pub fn hash(&self) -> &str {
        match self {
            Verdict::Accepted(hash) | Verdict::Rejected(hash) => hash,
        }
    }
}

pub struct BlockValidator<'a> {
    index: &'a HashIndex,
}

impl<'a> BlockValidator<'a> {
    pub fn new(index: &'a HashIndex) -> Self {
        Self { index }
    }

    /// Hash the block header and look it up.
    ///
    /// Only membership is checked here; position in the chain is the
    /// caller's job.
    pub fn check(&self, block: &RawBlock) -> Verdict {
        let hash = block_hash_hex(block.header());
        if self.index.contains(&hash) {
            Verdict::Accepted(hash)
        } else {
            Verdict::Rejected(hash)
        }
    }
}
