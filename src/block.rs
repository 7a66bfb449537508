use alloy_primitives::Bytes;
use serde::{Deserialize, Serialize};

/// A block as handed to a [`BlockHandler`](crate::poller::BlockHandler).
///
/// The payload is opaque to the poller; only the numbering and identity fields are used to drive
/// the cursor and to report finality downstream.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Default)]
pub struct Block {
    pub number: u64,
    pub id: String,
    pub parent_num: u64,
    pub parent_id: String,
    /// Last irreversible block number as reported by the upstream.
    pub lib_num: u64,
    /// Block timestamp in seconds.
    pub timestamp: u64,
    #[serde(default)]
    pub payload: Bytes,
}

impl Block {
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Outcome of a successful fetch against one endpoint.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FetchedBlock {
    Block(Block),
    /// The requested number legitimately has no block (e.g. an empty slot).
    Skipped,
}

impl From<Block> for FetchedBlock {
    fn from(block: Block) -> Self {
        Self::Block(block)
    }
}
