//! Driving ports (Inbound API)

use crate::domain::Round;
use crate::ports::PackingRequest;
use async_trait::async_trait;
use shared_types::{BlockHeader, PeerId};

/// Entry points of the consensus core.
///
/// Message handlers never fail toward the caller: malformed or invalid
/// input is logged, counted and dropped.
#[async_trait]
pub trait ConsensusApi: Send + Sync {
    /// A `vote` payload arrived from `peer`.
    fn on_vote_message(&self, peer: PeerId, payload: &[u8]);

    /// A `voteResult` payload arrived from `peer`.
    fn on_result_message(&self, peer: PeerId, payload: &[u8]);

    /// A `getVoteResult` request arrived from `peer`. Answered from the
    /// result cache; unknown hashes get no reply.
    async fn on_result_request(&self, peer: PeerId, payload: &[u8]);

    /// A block for the current round became available (received or
    /// assembled). May open voting and cast this node's pre-vote.
    async fn on_new_block(&self, header: BlockHeader);

    /// Queue a packing request for this node's slot. Returns `false` if the
    /// node is not participating or the packing queue is full.
    fn schedule_packing(&self, request: PackingRequest) -> bool;

    /// True if this node saw a pre-vote quorum for `height` in ballot
    /// `vote_round_index`.
    fn is_stage_one_confirmed(&self, height: u64, vote_round_index: u64) -> bool;

    /// The round this node is currently voting in, if participating.
    fn active_round(&self) -> Option<Round>;
}
