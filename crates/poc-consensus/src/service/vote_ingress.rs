//! Validation, tallying and gossip of individual votes.

use super::committer::{ResultOrigin, StageTwoResult};
use super::queue::QueueSender;
use super::ConsensusContext;
use crate::domain::{
    short_hash, DuplicateGuard, Round, StageResult, TallyBook, VoteKey, VoteMessage, VoteStage,
    VotingTarget, CMD_VOTE,
};
use crate::error::{ConsensusResult, Rejection};
use shared_crypto::P2pkSignature;
use shared_types::PeerId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Sole owner of the vote tallies.
pub(crate) struct VoteIngress {
    ctx: Arc<ConsensusContext>,
    tallies: TallyBook,
    seen: DuplicateGuard<VoteKey>,
    stage_one_tx: QueueSender<VotingTarget>,
}

impl VoteIngress {
    pub fn new(ctx: Arc<ConsensusContext>, stage_one_tx: QueueSender<VotingTarget>) -> Self {
        Self {
            tallies: TallyBook::new(ctx.config.byzantine_rate_percent),
            seen: DuplicateGuard::new(ctx.config.vote_guard_size),
            ctx,
            stage_one_tx,
        }
    }

    pub async fn run(mut self, mut rx: mpsc::Receiver<VoteMessage>) {
        while let Some(vote) = rx.recv().await {
            let outcome = self.handle(vote).await;
            self.ctx.log_outcome("vote-ingress", outcome);
        }
    }

    /// Validate one vote, count it and forward it to peers.
    ///
    /// Local votes are trusted: only their key is recorded. Remote votes
    /// must come from a seed or an active round member and carry a valid
    /// signature over the vote's signing hash.
    pub async fn handle(&mut self, vote: VoteMessage) -> ConsensusResult<()> {
        if !self.ctx.is_participant() {
            return Err(Rejection::NotParticipant.into());
        }
        let Some(signature) = vote.signature else {
            return Err(Rejection::MissingSignature.into());
        };
        let best_height = self.ctx.deps.chain_status.best_height();
        if vote.target.height <= best_height {
            return Err(Rejection::StaleHeight.into());
        }

        let floor = self.ctx.board.current_height().max(best_height + 1);
        let pruned = self.tallies.prune_below(floor);
        if pruned > 0 {
            debug!(floor, pruned, "[poc] pruned stale tallies");
        }

        let signer = signature.signer_address();
        let key = vote.key(signer);
        if !self.seen.insert_and_check(key) {
            return Err(Rejection::Duplicate.into());
        }

        let round = match self.ctx.round_of(&vote.target).await {
            Ok(round) => round,
            Err(e) => {
                self.seen.remove(&key);
                return Err(e);
            }
        };
        if vote.origin.is_remote() {
            if let Err(rejection) = self.authenticate(&vote, &signature, &round) {
                // A forged vote must not shadow the genuine one.
                self.seen.remove(&key);
                return Err(rejection.into());
            }
        }

        let payload = vote.encode()?;
        let exclude = vote.peer().cloned();
        let target = vote.target;
        // A result may only carry signatures of round members, so a seed's
        // pre-commit from outside the round is relayed but not counted.
        let counted = vote.stage == VoteStage::PreVote || round.member(&signer).is_some();
        self.ctx.metrics.record_vote_accepted();
        debug!(
            height = target.height,
            stage = ?vote.stage,
            block = %short_hash(&target.block_hash),
            remote = exclude.is_some(),
            counted,
            "[poc] vote accepted"
        );

        if counted {
            if let Some(result) = self.tallies.add_vote(signer, vote, round.member_count()) {
                self.route(result);
            }
        }
        self.gossip(payload, exclude).await;
        Ok(())
    }

    fn authenticate(
        &self,
        vote: &VoteMessage,
        signature: &P2pkSignature,
        round: &Round,
    ) -> Result<(), Rejection> {
        let signer = signature.signer_address();
        if !self.ctx.config.is_seed(&signer) && !round.is_active_member(&signer) {
            return Err(Rejection::UnknownSigner);
        }
        signature
            .verify(&vote.signing_hash())
            .map_err(|_| Rejection::BadSignature)
    }

    fn route(&self, result: StageResult) {
        match result {
            StageResult::PreVoteQuorum { target } => {
                self.ctx.metrics.record_pre_vote_quorum();
                info!(
                    height = target.height,
                    round = target.vote_round_index,
                    block = %short_hash(&target.block_hash),
                    "[poc] pre-vote quorum reached"
                );
                self.stage_one_tx.offer(target);
            }
            StageResult::PreCommitQuorum { result } => {
                self.ctx.metrics.record_pre_commit_quorum();
                info!(
                    height = result.height(),
                    signatures = result.signatures.len(),
                    block = %short_hash(&result.block_hash()),
                    "[poc] pre-commit quorum reached"
                );
                self.ctx.stage_two_tx.offer(StageTwoResult {
                    result,
                    origin: ResultOrigin::LocalQuorum,
                });
            }
        }
    }

    async fn gossip(&self, payload: Vec<u8>, exclude: Option<PeerId>) {
        let sent = self
            .ctx
            .deps
            .network
            .broadcast(self.ctx.config.chain_id, CMD_VOTE, payload, exclude.as_ref())
            .await;
        match sent {
            Ok(()) => self.ctx.metrics.record_vote_relayed(),
            Err(e) => warn!(error = %e, "[poc] vote broadcast failed"),
        }
    }
}
