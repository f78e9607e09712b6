//! Participation state machine.
//!
//! ```text
//! Idle ──module ready──► Syncing ──height synced──► NonParticipant
//!                                                     │        ▲
//!                                      local member   │        │ no longer
//!                                      in temp round  ▼        │ a member
//!                                                     Active ──┘
//! ```

use super::workers::ActiveWorkers;
use super::ConsensusContext;
use crate::domain::{Round, RoundMember};
use crate::error::{ConsensusError, ConsensusResult};
use crate::ports::SubnetJoinRequest;
use std::sync::Arc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

/// Where the node stands with respect to consensus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverState {
    /// Waiting for the consensus module to become ready.
    Idle,
    /// Waiting for height synchronisation.
    Syncing,
    /// Synced, but not a member of the current round.
    NonParticipant,
    /// Round member with voting workers running.
    Active,
}

pub(crate) struct ConsensusDriver {
    ctx: Arc<ConsensusContext>,
}

impl ConsensusDriver {
    pub fn new(ctx: Arc<ConsensusContext>) -> Self {
        Self { ctx }
    }

    /// Poll forever. A failed iteration is logged and retried on the next
    /// tick.
    pub async fn run(self) {
        let mut ticker = time::interval(self.ctx.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.tick().await {
                warn!(
                    state = ?self.ctx.driver_state(),
                    error = %e,
                    "[poc] driver iteration failed"
                );
            }
        }
    }

    /// Advance at most one state.
    pub async fn tick(&self) -> ConsensusResult<()> {
        let chain = &self.ctx.deps.chain_status;
        match self.ctx.driver_state() {
            DriverState::Idle => {
                if chain.is_module_ready() {
                    self.ctx.transition(DriverState::Syncing);
                }
            }
            DriverState::Syncing => {
                if chain.is_height_synced() {
                    self.ctx.transition(DriverState::NonParticipant);
                }
            }
            DriverState::NonParticipant => {
                let round = self.ctx.deps.round_provider.temp_round().await?;
                if let Some(local) = round.local_member.clone() {
                    self.activate(round, local).await?;
                }
            }
            DriverState::Active => {
                let round = self.ctx.deps.round_provider.temp_round().await?;
                match round.local_member.clone() {
                    Some(local) => self.ctx.refresh_active_round(round, local),
                    None => {
                        warn!(round = round.index, "[poc] no longer a round member");
                        deactivate(&self.ctx, DriverState::NonParticipant).await;
                    }
                }
            }
        }
        Ok(())
    }

    async fn activate(&self, round: Round, local: RoundMember) -> ConsensusResult<()> {
        let deps = &self.ctx.deps;
        deps.round_provider.switch_round(round.clone(), true).await?;

        let local_public_key = deps
            .signer
            .public_key(&local.address)
            .ok_or_else(|| ConsensusError::MissingKey(hex::encode(local.address)))?;
        deps.network
            .join_consensus_subnet(SubnetJoinRequest {
                chain_id: self.ctx.config.chain_id,
                local_public_key,
                seed_public_keys: self.ctx.seed_public_keys.clone(),
                member_addresses: round.members.iter().map(|m| m.address).collect(),
            })
            .await?;

        info!(
            round = round.index,
            slot = local.packing_index,
            members = round.member_count(),
            "[poc] joined consensus as round member"
        );
        let workers = ActiveWorkers::spawn(&self.ctx, round, local);
        self.ctx.install_workers(workers);
        self.ctx.transition(DriverState::Active);
        Ok(())
    }
}

/// Stop the active workers, if any, leave the subnet and move to `next`.
pub(crate) async fn deactivate(ctx: &ConsensusContext, next: DriverState) {
    if let Some(workers) = ctx.take_workers() {
        workers.stop().await;
        if let Err(e) = ctx
            .deps
            .network
            .leave_consensus_subnet(ctx.config.chain_id)
            .await
        {
            warn!(error = %e, "[poc] failed to leave consensus subnet");
        }
    }
    ctx.transition(next);
}
