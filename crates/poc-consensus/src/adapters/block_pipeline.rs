//! Block pipeline adapter
//!
//! Records byzantine confirmations instead of forwarding them. Used by
//! observers and in tests.

use crate::domain::ResultMessage;
use crate::error::ConsensusResult;
use crate::ports::BlockPipeline;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::Hash;

/// One reported confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedBlock {
    pub height: u64,
    pub block_hash: Hash,
    pub proof: ResultMessage,
}

/// In-memory block pipeline
#[derive(Default)]
pub struct InMemoryBlockPipeline {
    confirmed: RwLock<Vec<ConfirmedBlock>>,
}

impl InMemoryBlockPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirmed(&self) -> Vec<ConfirmedBlock> {
        self.confirmed.read().clone()
    }

    pub fn confirmed_count(&self) -> usize {
        self.confirmed.read().len()
    }
}

#[async_trait]
impl BlockPipeline for InMemoryBlockPipeline {
    async fn notify_byzantine_confirmed(
        &self,
        height: u64,
        block_hash: Hash,
        proof: &ResultMessage,
    ) -> ConsensusResult<()> {
        self.confirmed.write().push(ConfirmedBlock {
            height,
            block_hash,
            proof: proof.clone(),
        });
        Ok(())
    }
}
