//! Per-target vote counting and quorum detection.

use super::message::{ResultMessage, VoteMessage};
use super::target::{VoteStage, VotingTarget};
use shared_types::Address;
use std::collections::HashMap;

/// True if `count` votes out of `member_count` strictly exceed
/// `rate_percent`. Integer arithmetic; an empty round never has a quorum.
pub fn exceeds_byzantine_rate(count: usize, member_count: usize, rate_percent: u8) -> bool {
    member_count > 0 && count * 100 > rate_percent as usize * member_count
}

/// How far a target has progressed. Each stage reports at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TallyPhase {
    Collecting,
    PreVoteDone,
    PreCommitDone,
}

/// A quorum reached by the vote just added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageResult {
    PreVoteQuorum { target: VotingTarget },
    /// Carries the pre-commit signatures collected up to the quorum.
    PreCommitQuorum { result: ResultMessage },
}

/// Votes for a single target, one per signer and stage.
#[derive(Debug)]
pub struct VoteTally {
    target: VotingTarget,
    byzantine_rate_percent: u8,
    pre_votes: HashMap<Address, VoteMessage>,
    pre_commits: HashMap<Address, VoteMessage>,
    phase: TallyPhase,
}

impl VoteTally {
    pub fn new(target: VotingTarget, byzantine_rate_percent: u8) -> Self {
        Self {
            target,
            byzantine_rate_percent,
            pre_votes: HashMap::new(),
            pre_commits: HashMap::new(),
            phase: TallyPhase::Collecting,
        }
    }

    /// Count `vote` from `signer` and report a quorum if this vote completed
    /// one. A second vote from the same signer at the same stage is ignored.
    ///
    /// A pre-commit quorum seen before the local pre-vote quorum completes
    /// both stages: the pre-commits already prove the pre-vote quorum.
    pub fn add_vote(
        &mut self,
        signer: Address,
        vote: VoteMessage,
        member_count: usize,
    ) -> Option<StageResult> {
        let stage = vote.stage;
        let votes = match stage {
            VoteStage::PreVote => &mut self.pre_votes,
            VoteStage::PreCommit => &mut self.pre_commits,
        };
        if votes.contains_key(&signer) {
            return None;
        }
        votes.insert(signer, vote);
        let count = votes.len();

        if !exceeds_byzantine_rate(count, member_count, self.byzantine_rate_percent) {
            return None;
        }

        match (stage, self.phase) {
            (VoteStage::PreVote, TallyPhase::Collecting) => {
                self.phase = TallyPhase::PreVoteDone;
                Some(StageResult::PreVoteQuorum {
                    target: self.target,
                })
            }
            (VoteStage::PreCommit, TallyPhase::Collecting | TallyPhase::PreVoteDone) => {
                self.phase = TallyPhase::PreCommitDone;
                Some(StageResult::PreCommitQuorum {
                    result: ResultMessage::from_votes(
                        self.target,
                        VoteStage::PreCommit,
                        self.pre_commits.values(),
                    ),
                })
            }
            _ => None,
        }
    }

    pub fn target(&self) -> &VotingTarget {
        &self.target
    }

    pub fn phase(&self) -> TallyPhase {
        self.phase
    }

    pub fn count(&self, stage: VoteStage) -> usize {
        match stage {
            VoteStage::PreVote => self.pre_votes.len(),
            VoteStage::PreCommit => self.pre_commits.len(),
        }
    }
}

/// All live tallies, keyed by target.
#[derive(Debug)]
pub struct TallyBook {
    byzantine_rate_percent: u8,
    tallies: HashMap<VotingTarget, VoteTally>,
}

impl TallyBook {
    pub fn new(byzantine_rate_percent: u8) -> Self {
        Self {
            byzantine_rate_percent,
            tallies: HashMap::new(),
        }
    }

    /// Route a vote to the tally of its target, creating it on first sight.
    pub fn add_vote(
        &mut self,
        signer: Address,
        vote: VoteMessage,
        member_count: usize,
    ) -> Option<StageResult> {
        let rate = self.byzantine_rate_percent;
        self.tallies
            .entry(vote.target)
            .or_insert_with(|| VoteTally::new(vote.target, rate))
            .add_vote(signer, vote, member_count)
    }

    /// Drop every tally below `height`. Returns how many were dropped.
    pub fn prune_below(&mut self, height: u64) -> usize {
        let before = self.tallies.len();
        self.tallies.retain(|target, _| target.height >= height);
        before - self.tallies.len()
    }

    pub fn get(&self, target: &VotingTarget) -> Option<&VoteTally> {
        self.tallies.get(target)
    }

    pub fn len(&self) -> usize {
        self.tallies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::target::FIRST_VOTE_ROUND;
    use shared_crypto::Secp256k1KeyPair;

    fn target(height: u64) -> VotingTarget {
        VotingTarget {
            height,
            round_index: 2,
            round_start_time: 20_000,
            packing_index_of_round: 1,
            vote_round_index: FIRST_VOTE_ROUND,
            block_hash: [height as u8; 32],
        }
    }

    fn vote(keypair: &Secp256k1KeyPair, target: VotingTarget, stage: VoteStage) -> VoteMessage {
        let vote = VoteMessage::new(target, stage);
        let sig = keypair.sign_p2pk(&vote.signing_hash()).unwrap();
        vote.with_signature(sig)
    }

    #[test]
    fn test_byzantine_rate_is_strict() {
        assert!(exceeds_byzantine_rate(3, 4, 66));
        assert!(!exceeds_byzantine_rate(2, 4, 66));
        // 2/3 at 66%: 200 > 198.
        assert!(exceeds_byzantine_rate(2, 3, 66));
        // 1/2 at 50% is a draw, not a quorum.
        assert!(!exceeds_byzantine_rate(1, 2, 50));
        assert!(!exceeds_byzantine_rate(0, 0, 66));
    }

    #[test]
    fn test_pre_vote_quorum_reported_once() {
        let keys: Vec<_> = (0..4).map(|_| Secp256k1KeyPair::generate()).collect();
        let mut tally = VoteTally::new(target(5), 66);

        let mut reports = Vec::new();
        for k in &keys {
            if let Some(r) = tally.add_vote(k.address(), vote(k, target(5), VoteStage::PreVote), 4) {
                reports.push(r);
            }
        }

        assert_eq!(reports, vec![StageResult::PreVoteQuorum { target: target(5) }]);
        assert_eq!(tally.phase(), TallyPhase::PreVoteDone);
        assert_eq!(tally.count(VoteStage::PreVote), 4);
    }

    #[test]
    fn test_same_signer_counts_once() {
        let k = Secp256k1KeyPair::generate();
        let mut tally = VoteTally::new(target(5), 50);
        for _ in 0..3 {
            assert!(tally
                .add_vote(k.address(), vote(&k, target(5), VoteStage::PreVote), 3)
                .is_none());
        }
        assert_eq!(tally.count(VoteStage::PreVote), 1);
    }

    #[test]
    fn test_pre_commit_quorum_snapshots_signatures() {
        let keys: Vec<_> = (0..4).map(|_| Secp256k1KeyPair::generate()).collect();
        let mut tally = VoteTally::new(target(5), 66);
        for k in &keys[..3] {
            tally.add_vote(k.address(), vote(k, target(5), VoteStage::PreVote), 4);
        }

        let mut result = None;
        for k in &keys {
            if let Some(r) = tally.add_vote(k.address(), vote(k, target(5), VoteStage::PreCommit), 4) {
                assert!(result.is_none(), "pre-commit quorum reported twice");
                result = Some(r);
            }
        }

        match result {
            Some(StageResult::PreCommitQuorum { result }) => {
                assert_eq!(result.signatures.len(), 3);
                assert_eq!(result.stage, VoteStage::PreCommit);
                for sig in &result.signatures {
                    assert!(sig.verify(&result.signing_hash()).is_ok());
                }
            }
            other => panic!("expected pre-commit quorum, got {other:?}"),
        }
        assert_eq!(tally.phase(), TallyPhase::PreCommitDone);
    }

    #[test]
    fn test_pre_commit_quorum_without_local_pre_votes() {
        let keys: Vec<_> = (0..3).map(|_| Secp256k1KeyPair::generate()).collect();
        let mut tally = VoteTally::new(target(5), 66);

        let mut reports = 0;
        for k in &keys {
            if tally
                .add_vote(k.address(), vote(k, target(5), VoteStage::PreCommit), 3)
                .is_some()
            {
                reports += 1;
            }
        }
        assert_eq!(reports, 1);

        // Late pre-votes no longer report anything.
        for k in &keys {
            assert!(tally
                .add_vote(k.address(), vote(k, target(5), VoteStage::PreVote), 3)
                .is_none());
        }
    }

    #[test]
    fn test_book_separates_targets_and_prunes() {
        let keys: Vec<_> = (0..2).map(|_| Secp256k1KeyPair::generate()).collect();
        let mut book = TallyBook::new(66);
        for k in &keys {
            book.add_vote(k.address(), vote(k, target(5), VoteStage::PreVote), 4);
            book.add_vote(k.address(), vote(k, target(6), VoteStage::PreVote), 4);
        }
        assert_eq!(book.len(), 2);
        assert_eq!(book.get(&target(5)).unwrap().count(VoteStage::PreVote), 2);

        assert_eq!(book.prune_below(6), 1);
        assert!(book.get(&target(5)).is_none());
        assert!(book.get(&target(6)).is_some());
    }
}
