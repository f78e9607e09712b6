//! Consumer of pre-commit quorums and verified results.

use super::ConsensusContext;
use crate::domain::{short_hash, ResultMessage, CMD_VOTE_RESULT};
use crate::error::ConsensusResult;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Where a stage-two result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResultOrigin {
    /// This node's own tally reached the pre-commit quorum.
    LocalQuorum,
    /// `ResultIngress` verified the result.
    Verified,
}

#[derive(Debug, Clone)]
pub(crate) struct StageTwoResult {
    pub result: ResultMessage,
    pub origin: ResultOrigin,
}

pub(crate) struct Committer {
    ctx: Arc<ConsensusContext>,
}

impl Committer {
    pub fn new(ctx: Arc<ConsensusContext>) -> Self {
        Self { ctx }
    }

    pub async fn run(self, mut rx: mpsc::Receiver<StageTwoResult>) {
        while let Some(item) = rx.recv().await {
            let outcome = self.handle(item).await;
            self.ctx.log_outcome("committer", outcome);
        }
    }

    /// A local quorum is gossiped and fed back through `ResultIngress`, so
    /// it is verified exactly like a peer's. A verified result is final.
    pub async fn handle(&self, item: StageTwoResult) -> ConsensusResult<()> {
        let result = item.result;
        match item.origin {
            ResultOrigin::LocalQuorum => {
                let payload = result.encode()?;
                if let Err(e) = self
                    .ctx
                    .deps
                    .network
                    .broadcast(self.ctx.config.chain_id, CMD_VOTE_RESULT, payload, None)
                    .await
                {
                    warn!(height = result.height(), error = %e, "[poc] result broadcast failed");
                }
                self.ctx.result_tx.offer(result);
            }
            ResultOrigin::Verified => {
                let block_hash = result.block_hash();
                if let Err(e) = self
                    .ctx
                    .deps
                    .block_pipeline
                    .notify_byzantine_confirmed(result.height(), block_hash, &result)
                    .await
                {
                    // Let a re-delivered copy of this result through again.
                    self.ctx.confirmed_results.remove(&block_hash);
                    return Err(e);
                }
                self.ctx.board.finish_height(result.height());
                self.ctx.metrics.record_block_committed();
                info!(
                    height = result.height(),
                    block = %short_hash(&block_hash),
                    signatures = result.signatures.len(),
                    "[poc] block byzantine-confirmed"
                );
            }
        }
        Ok(())
    }
}
