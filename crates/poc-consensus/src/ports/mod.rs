//! Ports layer (Hexagonal Architecture)
//!
//! - Inbound: the API the host node drives (network handlers, block sync,
//!   the packing scheduler)
//! - Outbound: collaborators the consensus core depends on

pub mod inbound;
pub mod outbound;

pub use inbound::ConsensusApi;
pub use outbound::{
    BlockAssembler, BlockPipeline, ChainStatus, NetworkGateway, PackingRequest, RoundProvider,
    SubnetJoinRequest, VoteSigner,
};
