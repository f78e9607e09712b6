//! Verification of pre-commit quorum proofs.

use super::committer::{ResultOrigin, StageTwoResult};
use super::ConsensusContext;
use crate::domain::{exceeds_byzantine_rate, short_hash, ResultMessage, VoteStage};
use crate::error::{ConsensusResult, Rejection};
use shared_types::is_empty_hash;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub(crate) struct ResultIngress {
    ctx: Arc<ConsensusContext>,
}

impl ResultIngress {
    pub fn new(ctx: Arc<ConsensusContext>) -> Self {
        Self { ctx }
    }

    pub async fn run(self, mut rx: mpsc::Receiver<ResultMessage>) {
        while let Some(result) = rx.recv().await {
            let outcome = self.handle(result).await;
            self.ctx.log_outcome("result-ingress", outcome);
        }
    }

    /// Accept a result only for the next height, only at the pre-commit
    /// stage, and only if its distinct valid signers exceed the byzantine
    /// rate of the round. Each block hash is accepted once; a result whose
    /// commit fails is forgotten so a re-delivered copy is verified again.
    pub async fn handle(&self, result: ResultMessage) -> ConsensusResult<()> {
        let chain = &self.ctx.deps.chain_status;
        if result.signatures.is_empty() {
            return Err(Rejection::EmptySignatures.into());
        }
        if result.height() != chain.best_height() + 1 {
            return Err(Rejection::WrongHeight.into());
        }
        if is_empty_hash(&result.block_hash()) {
            return Err(Rejection::EmptyBlockHash.into());
        }
        if result.stage != VoteStage::PreCommit {
            return Err(Rejection::WrongStage.into());
        }

        let round = self.ctx.round_of(&result.target).await?;
        let members = round.member_addresses();
        let signing_hash = result.signing_hash();
        let mut signers = HashSet::with_capacity(result.signatures.len());
        for signature in &result.signatures {
            let signer = signature.signer_address();
            if !members.contains(&signer) {
                return Err(Rejection::UnknownSigner.into());
            }
            signature
                .verify(&signing_hash)
                .map_err(|_| Rejection::BadSignature)?;
            signers.insert(signer);
        }
        if !exceeds_byzantine_rate(
            signers.len(),
            round.member_count(),
            self.ctx.config.byzantine_rate_percent,
        ) {
            return Err(Rejection::InsufficientQuorum.into());
        }

        let block_hash = result.block_hash();
        if !self.ctx.confirmed_results.insert_and_check(block_hash) {
            return Err(Rejection::Duplicate.into());
        }
        self.ctx.metrics.record_result_accepted();
        self.ctx.results.insert(result.clone());
        debug!(
            height = result.height(),
            signers = signers.len(),
            block = %short_hash(&block_hash),
            "[poc] result verified"
        );

        let participating =
            self.ctx.is_participant() && chain.is_subnet_ready() && chain.is_height_synced();
        if !participating {
            if let Err(e) = self
                .ctx
                .deps
                .block_pipeline
                .notify_byzantine_confirmed(result.height(), block_hash, &result)
                .await
            {
                self.ctx.confirmed_results.remove(&block_hash);
                return Err(e);
            }
            self.ctx.metrics.record_block_committed();
            info!(
                height = result.height(),
                block = %short_hash(&block_hash),
                "[poc] block byzantine-confirmed by observed result"
            );
            return Ok(());
        }

        let height = result.height();
        let queued = self.ctx.stage_two_tx.offer(StageTwoResult {
            result,
            origin: ResultOrigin::Verified,
        });
        if !queued {
            self.ctx.confirmed_results.remove(&block_hash);
            warn!(
                height,
                block = %short_hash(&block_hash),
                "[poc] verified result dropped, awaiting re-delivery"
            );
        }
        Ok(())
    }
}
