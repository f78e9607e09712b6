//! This node's own pre-votes.

use super::ConsensusContext;
use crate::domain::{
    short_hash, AddBlockOutcome, VoteStage, VotingTarget, FIRST_VOTE_ROUND,
};
use crate::error::{ConsensusError, ConsensusResult, Rejection};
use shared_types::BlockHeader;
use tracing::{debug, info};

/// Put `header` on the candidate board and cast a pre-vote if it opened
/// voting for its height.
pub(crate) async fn accept_block(ctx: &ConsensusContext, header: BlockHeader) -> ConsensusResult<()> {
    let height = header.height;
    match ctx.board.add_block(header) {
        AddBlockOutcome::NewCandidate(header) => {
            if !ctx.is_participant() {
                return Ok(());
            }
            let outcome = cast_pre_vote(ctx, &header).await;
            if let Err(ConsensusError::Rejected(Rejection::UnknownPacker | Rejection::NoCandidate)) =
                &outcome
            {
                // Let a valid block at this height open voting instead.
                ctx.board.clear(false);
            }
            outcome
        }
        AddBlockOutcome::Stored => {
            debug!(height, "[poc] alternative candidate stored");
            Ok(())
        }
        AddBlockOutcome::Stale => {
            debug!(height, current = ctx.board.current_height(), "[poc] stale block ignored");
            Ok(())
        }
    }
}

/// Sign and submit a pre-vote for the candidate matching `header`'s slot.
async fn cast_pre_vote(ctx: &ConsensusContext, header: &BlockHeader) -> ConsensusResult<()> {
    let round = ctx
        .deps
        .round_provider
        .get_round(header.round.round_index, header.round.round_start_time)
        .await?;
    let Some(local) = round.local_member.as_ref() else {
        debug!(height = header.height, "[poc] not a member of the block's round, no pre-vote");
        return Ok(());
    };
    let packing_index = round
        .packing_index_of(&header.packer)
        .ok_or(Rejection::UnknownPacker)?;
    let candidate = ctx
        .board
        .next_voting_item(header.height, round.index, packing_index, round.start_time)
        .ok_or(Rejection::NoCandidate)?;

    let block_hash = candidate.hash();
    ctx.board.mark_voted(block_hash);
    let target = VotingTarget::for_block(&candidate, FIRST_VOTE_ROUND);
    let vote = ctx.sign_vote(target, VoteStage::PreVote, &local.address)?;
    if ctx.submit_vote(vote) {
        info!(
            height = target.height,
            slot = target.packing_index_of_round,
            block = %short_hash(&block_hash),
            "[poc] pre-vote cast"
        );
    }
    Ok(())
}
