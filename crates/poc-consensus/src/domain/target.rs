//! The identity of a vote.

use serde::{Deserialize, Serialize};
use shared_crypto::{sha256_many, Hash};
use shared_types::BlockHeader;

/// Domain tag prefixed to every vote signing hash.
const VOTE_DOMAIN: &[u8] = b"POC_BFT_VOTE_V1";

/// Vote round used for the first ballot at every height.
pub const FIRST_VOTE_ROUND: u64 = 1;

/// The two voting stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VoteStage {
    /// Stage 1: "I consider this block the candidate for the slot."
    PreVote,
    /// Stage 2: "I saw a pre-vote quorum for this block."
    PreCommit,
}

impl VoteStage {
    pub fn as_u8(self) -> u8 {
        match self {
            VoteStage::PreVote => 1,
            VoteStage::PreCommit => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(VoteStage::PreVote),
            2 => Some(VoteStage::PreCommit),
            _ => None,
        }
    }
}

/// Everything a vote is about, except its stage and its signer.
///
/// Two votes count toward the same tally only if their targets are equal in
/// every field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VotingTarget {
    pub height: u64,
    pub round_index: u64,
    pub round_start_time: u64,
    pub packing_index_of_round: u32,
    /// Ballot number within the height.
    pub vote_round_index: u64,
    pub block_hash: Hash,
}

impl VotingTarget {
    /// Target for voting on `header` in the given ballot.
    pub fn for_block(header: &BlockHeader, vote_round_index: u64) -> Self {
        Self {
            height: header.height,
            round_index: header.round.round_index,
            round_start_time: header.round.round_start_time,
            packing_index_of_round: header.round.packing_index_of_round,
            vote_round_index,
            block_hash: header.hash(),
        }
    }

    /// `(round_index, packing_index_of_round)`, ordered by chain progress.
    pub fn slot(&self) -> (u64, u32) {
        (self.round_index, self.packing_index_of_round)
    }

    /// The hash a member signs when voting on this target at `stage`.
    ///
    /// Layout: domain tag, then every target field little-endian, then the
    /// stage byte.
    pub fn signing_hash(&self, stage: VoteStage) -> Hash {
        sha256_many(&[
            VOTE_DOMAIN,
            &self.height.to_le_bytes(),
            &self.round_index.to_le_bytes(),
            &self.round_start_time.to_le_bytes(),
            &self.packing_index_of_round.to_le_bytes(),
            &self.vote_round_index.to_le_bytes(),
            &self.block_hash,
            &[stage.as_u8()],
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> VotingTarget {
        VotingTarget {
            height: 10,
            round_index: 3,
            round_start_time: 9_000,
            packing_index_of_round: 2,
            vote_round_index: FIRST_VOTE_ROUND,
            block_hash: [7u8; 32],
        }
    }

    #[test]
    fn test_signing_hash_binds_stage() {
        let t = target();
        assert_ne!(
            t.signing_hash(VoteStage::PreVote),
            t.signing_hash(VoteStage::PreCommit)
        );
    }

    #[test]
    fn test_signing_hash_binds_every_field() {
        let base = target().signing_hash(VoteStage::PreVote);
        let mut t = target();
        t.vote_round_index = 2;
        assert_ne!(t.signing_hash(VoteStage::PreVote), base);

        let mut t = target();
        t.packing_index_of_round = 3;
        assert_ne!(t.signing_hash(VoteStage::PreVote), base);
    }

    #[test]
    fn test_slot_ordering() {
        let mut later = target();
        later.packing_index_of_round = 3;
        assert!(target().slot() < later.slot());

        let mut next_round = target();
        next_round.round_index = 4;
        next_round.packing_index_of_round = 1;
        assert!(later.slot() < next_round.slot());
    }

    #[test]
    fn test_stage_byte_mapping() {
        assert_eq!(VoteStage::from_u8(1), Some(VoteStage::PreVote));
        assert_eq!(VoteStage::from_u8(2), Some(VoteStage::PreCommit));
        assert_eq!(VoteStage::from_u8(3), None);
    }
}
