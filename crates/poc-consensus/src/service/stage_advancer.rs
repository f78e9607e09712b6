//! Turns pre-vote quorums into this node's pre-commit.

use super::ConsensusContext;
use crate::domain::{short_hash, VoteStage, VotingTarget};
use crate::error::{ConsensusResult, Rejection};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

pub(crate) struct StageAdvancer {
    ctx: Arc<ConsensusContext>,
}

impl StageAdvancer {
    pub fn new(ctx: Arc<ConsensusContext>) -> Self {
        Self { ctx }
    }

    pub async fn run(self, mut rx: mpsc::Receiver<VotingTarget>) {
        while let Some(target) = rx.recv().await {
            let outcome = self.handle(target).await;
            self.ctx.log_outcome("stage-advancer", outcome);
        }
    }

    pub async fn handle(&self, target: VotingTarget) -> ConsensusResult<()> {
        if target.slot() < self.ctx.deps.chain_status.last_confirmed_slot() {
            return Err(Rejection::StaleRound.into());
        }
        self.ctx
            .stage_one_confirmed
            .insert_and_check((target.height, target.vote_round_index));

        let round = self.ctx.round_of(&target).await?;
        let Some(local) = round.local_member else {
            debug!(height = target.height, "[poc] not a member of the vote's round, no pre-commit");
            return Ok(());
        };

        let vote = self
            .ctx
            .sign_vote(target, VoteStage::PreCommit, &local.address)?;
        if self.ctx.submit_vote(vote) {
            debug!(
                height = target.height,
                block = %short_hash(&target.block_hash),
                "[poc] pre-commit cast"
            );
        }
        Ok(())
    }
}
