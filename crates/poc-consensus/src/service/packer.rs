//! Block assembly for this node's packing slot.

use super::{voter, ConsensusContext};
use crate::domain::short_hash;
use crate::error::ConsensusResult;
use crate::ports::PackingRequest;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub(crate) struct Packer {
    ctx: Arc<ConsensusContext>,
}

impl Packer {
    pub fn new(ctx: Arc<ConsensusContext>) -> Self {
        Self { ctx }
    }

    pub async fn run(self, mut rx: mpsc::Receiver<PackingRequest>) {
        while let Some(request) = rx.recv().await {
            let outcome = self.handle(request).await;
            self.ctx.log_outcome("packer", outcome);
        }
    }

    /// Assemble, register on the board and vote. A failed assembly drops
    /// the request; the slot is simply missed.
    pub async fn handle(&self, request: PackingRequest) -> ConsensusResult<()> {
        let settle_award = request.round.is_last_slot(&request.member);
        let assembled = self
            .ctx
            .deps
            .block_assembler
            .assemble(
                &request.member,
                &request.round,
                request.pack_start_time,
                settle_award,
            )
            .await;

        let header = match assembled {
            Ok(header) => header,
            Err(e) => {
                self.ctx.metrics.record_packing_failure();
                warn!(
                    round = request.round.index,
                    slot = request.member.packing_index,
                    error = %e,
                    "[poc] block assembly failed, packing request dropped"
                );
                return Ok(());
            }
        };

        self.ctx.metrics.record_block_packed();
        info!(
            height = header.height,
            round = request.round.index,
            slot = request.member.packing_index,
            block = %short_hash(&header.hash()),
            "[poc] block packed"
        );
        voter::accept_block(&self.ctx, header).await
    }
}
