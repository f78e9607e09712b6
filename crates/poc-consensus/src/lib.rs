//! # PoC Consensus
//!
//! Two-stage Byzantine-fault-tolerant finalization for a proof-of-credit
//! chain. Round members sign a pre-vote for the candidate block of a slot;
//! once more than the configured share of members pre-voted, each member
//! signs a pre-commit. A pre-commit quorum becomes a [`ResultMessage`] that
//! any node can verify and hand to its block pipeline as proof of
//! finality.
//!
//! ## Architecture
//!
//! ```text
//!  network ──► VoteIngress ──► StageAdvancer ──► (local pre-commit)
//!                 │                                     │
//!                 └──────────► Committer ◄──────────────┘
//!                                 │   ▲
//!  network ──► ResultIngress ─────┘   │
//!                 ▲                   │
//!                 └─── self-delivery ─┘
//!
//!  ConsensusDriver: Idle → Syncing → NonParticipant ⇄ Active
//! ```
//!
//! Every hop is a bounded queue. A full queue drops the item and counts the
//! drop; nothing in the pipeline blocks a producer.
//!
//! ## Crate layout
//!
//! - [`domain`]: pure voting state (targets, messages, tallies, guards)
//! - [`ports`]: the API this crate offers and the collaborators it needs
//! - [`service`]: the worker tasks and the participation driver
//! - [`adapters`]: in-process implementations of the small ports

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

pub use config::ConsensusConfig;
pub use domain::{
    AddBlockOutcome, CandidateBoard, DuplicateGuard, ResultCache, ResultMessage, Round,
    RoundMember, StageResult, TallyBook, VoteMessage, VoteOrigin, VoteStage, VoteTally,
    VotingTarget,
};
pub use error::{ConsensusError, ConsensusResult, Rejection};
pub use metrics::{Metrics, MetricsSnapshot, QueueKind};
pub use ports::{
    BlockAssembler, BlockPipeline, ChainStatus, ConsensusApi, NetworkGateway, PackingRequest,
    RoundProvider, SubnetJoinRequest, VoteSigner,
};
pub use service::{ConsensusDependencies, ConsensusService, DriverState};
