//! Domain layer for two-stage block voting
//!
//! Pure state with no I/O: voting targets, wire messages, per-target tallies
//! and the candidate board. Shared structures (`DuplicateGuard`,
//! `CandidateBoard`, `ResultCache`) synchronise internally and take `&self`.

pub mod candidate_board;
pub mod duplicate_guard;
pub mod message;
pub mod result_cache;
pub mod round;
pub mod target;
pub mod vote_tally;

pub use candidate_board::{AddBlockOutcome, CandidateBoard};
pub use duplicate_guard::DuplicateGuard;
pub use message::{
    decode_result_request, encode_result_request, ResultMessage, VoteKey, VoteMessage, VoteOrigin,
    CMD_GET_VOTE_RESULT, CMD_VOTE, CMD_VOTE_RESULT,
};
pub use result_cache::ResultCache;
pub use round::{Round, RoundMember};
pub use target::{VoteStage, VotingTarget, FIRST_VOTE_ROUND};
pub use vote_tally::{exceeds_byzantine_rate, StageResult, TallyBook, TallyPhase, VoteTally};

use shared_types::Hash;

/// First eight bytes of a hash in hex, for log fields.
pub fn short_hash(hash: &Hash) -> String {
    hex::encode(&hash[..8])
}
