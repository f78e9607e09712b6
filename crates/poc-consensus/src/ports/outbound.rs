//! Driven ports (Outbound dependencies)
//!
//! Everything the voting core needs from the rest of the node. Async ports
//! may do I/O; the sync ports are expected to answer from memory.

use crate::domain::{ResultMessage, Round, RoundMember};
use crate::error::ConsensusResult;
use async_trait::async_trait;
use shared_crypto::{P2pkSignature, Secp256k1PublicKey};
use shared_types::{Address, BlockHeader, ChainId, Hash, PeerId};

/// Source of packing rounds.
#[async_trait]
pub trait RoundProvider: Send + Sync {
    /// The round with the given identity, including this node's slot.
    async fn get_round(&self, round_index: u64, round_start_time: u64) -> ConsensusResult<Round>;

    /// The round computed from the current chain tip and clock.
    async fn temp_round(&self) -> ConsensusResult<Round>;

    /// Make `round` the node's current round.
    async fn switch_round(&self, round: Round, persist: bool) -> ConsensusResult<()>;
}

/// A request to assemble this node's block for its slot.
#[derive(Debug, Clone)]
pub struct PackingRequest {
    pub round: Round,
    pub member: RoundMember,
    /// Unix millis at which the slot opens.
    pub pack_start_time: u64,
}

/// Builds blocks.
#[async_trait]
pub trait BlockAssembler: Send + Sync {
    /// Assemble a block for `member`'s slot. `settle_award` is set for the
    /// last slot of the round.
    async fn assemble(
        &self,
        member: &RoundMember,
        round: &Round,
        pack_start_time: u64,
        settle_award: bool,
    ) -> ConsensusResult<BlockHeader>;
}

/// Parameters for joining the consensus subnet.
#[derive(Debug, Clone)]
pub struct SubnetJoinRequest {
    pub chain_id: ChainId,
    pub local_public_key: Secp256k1PublicKey,
    pub seed_public_keys: Vec<Secp256k1PublicKey>,
    pub member_addresses: Vec<Address>,
}

/// Peer-to-peer transport.
#[async_trait]
pub trait NetworkGateway: Send + Sync {
    /// Send `payload` under `cmd` to every connected peer except `exclude`.
    async fn broadcast(
        &self,
        chain_id: ChainId,
        cmd: &str,
        payload: Vec<u8>,
        exclude: Option<&PeerId>,
    ) -> ConsensusResult<()>;

    async fn send_to_node(
        &self,
        chain_id: ChainId,
        peer: &PeerId,
        cmd: &str,
        payload: Vec<u8>,
    ) -> ConsensusResult<()>;

    async fn join_consensus_subnet(&self, request: SubnetJoinRequest) -> ConsensusResult<()>;

    async fn leave_consensus_subnet(&self, chain_id: ChainId) -> ConsensusResult<()>;
}

/// The downstream block pipeline.
#[async_trait]
pub trait BlockPipeline: Send + Sync {
    /// `block_hash` at `height` is final; `proof` carries the pre-commit
    /// quorum.
    async fn notify_byzantine_confirmed(
        &self,
        height: u64,
        block_hash: Hash,
        proof: &ResultMessage,
    ) -> ConsensusResult<()>;
}

/// Synchronous view of local chain progress.
pub trait ChainStatus: Send + Sync {
    fn is_module_ready(&self) -> bool;
    fn is_height_synced(&self) -> bool;
    fn is_subnet_ready(&self) -> bool;
    fn best_height(&self) -> u64;
    /// `(round_index, packing_index_of_round)` of the last confirmed block.
    fn last_confirmed_slot(&self) -> (u64, u32);
}

/// Key custody. Private keys never leave the implementor.
pub trait VoteSigner: Send + Sync {
    fn public_key(&self, address: &Address) -> Option<Secp256k1PublicKey>;

    /// Sign `hash` with the key of `address`.
    fn sign(&self, address: &Address, hash: &Hash) -> ConsensusResult<P2pkSignature>;
}
