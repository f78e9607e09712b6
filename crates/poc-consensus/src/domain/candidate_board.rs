//! Candidate blocks for the height currently being voted on.
//!
//! The board is the single point that decides when this node starts voting
//! on a height. Every mutation happens under one lock, so the "new height"
//! check and the reset it triggers are atomic.

use parking_lot::Mutex;
use shared_types::{BlockHeader, Hash};
use std::collections::BTreeMap;

/// What [`CandidateBoard::add_block`] did with a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddBlockOutcome {
    /// The header opened voting; the caller should cast a pre-vote.
    NewCandidate(BlockHeader),
    /// Stored as an alternative candidate for the current height.
    Stored,
    /// Below the current height; discarded.
    Stale,
}

#[derive(Default)]
struct BoardState {
    current_height: u64,
    voted_block_hash: Option<Hash>,
    // Ordered by hash: ties between candidates resolve to the lowest hash.
    candidates: BTreeMap<Hash, BlockHeader>,
}

/// Blocks awaiting a vote, keyed by hash.
#[derive(Default)]
pub struct CandidateBoard {
    state: Mutex<BoardState>,
}

impl CandidateBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a block.
    ///
    /// A header above the current height, or at the current height while
    /// nothing is being voted on, resets the board and opens voting on it.
    /// Voting stays latched on that header until [`CandidateBoard::clear`].
    pub fn add_block(&self, header: BlockHeader) -> AddBlockOutcome {
        let hash = header.hash();
        let mut state = self.state.lock();

        if header.height < state.current_height {
            return AddBlockOutcome::Stale;
        }

        let opens_voting = header.height > state.current_height || state.voted_block_hash.is_none();
        if opens_voting {
            if header.height > state.current_height {
                state.candidates.clear();
            }
            state.current_height = header.height;
            state.voted_block_hash = Some(hash);
            state.candidates.insert(hash, header.clone());
            AddBlockOutcome::NewCandidate(header)
        } else {
            state.candidates.insert(hash, header);
            AddBlockOutcome::Stored
        }
    }

    /// The stored block for `height` whose embedded round matches the given
    /// slot. Among several matches the lowest hash wins.
    pub fn next_voting_item(
        &self,
        height: u64,
        round_index: u64,
        packing_index: u32,
        round_start_time: u64,
    ) -> Option<BlockHeader> {
        let state = self.state.lock();
        state
            .candidates
            .values()
            .find(|h| {
                h.height == height && h.matches_slot(round_index, round_start_time, packing_index)
            })
            .cloned()
    }

    /// Record the block this node actually voted for.
    pub fn mark_voted(&self, block_hash: Hash) {
        self.state.lock().voted_block_hash = Some(block_hash);
    }

    /// Stop voting on the current height. With `reset_candidates` the
    /// stored blocks are dropped too.
    pub fn clear(&self, reset_candidates: bool) {
        let mut state = self.state.lock();
        state.voted_block_hash = None;
        if reset_candidates {
            state.candidates.clear();
        }
    }

    /// Release the vote latch once `height` is final, unless the board has
    /// already moved past it.
    pub fn finish_height(&self, height: u64) -> bool {
        let mut state = self.state.lock();
        if state.current_height != height {
            return false;
        }
        state.voted_block_hash = None;
        true
    }

    pub fn current_height(&self) -> u64 {
        self.state.lock().current_height
    }

    pub fn voted_block_hash(&self) -> Option<Hash> {
        self.state.lock().voted_block_hash
    }

    pub fn get(&self, block_hash: &Hash) -> Option<BlockHeader> {
        self.state.lock().candidates.get(block_hash).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::RoundData;

    fn header(height: u64, packing_index: u32, salt: u8) -> BlockHeader {
        BlockHeader {
            height,
            parent_hash: [salt; 32],
            merkle_root: [0u8; 32],
            timestamp: 1_000 + salt as u64,
            packer: [packing_index as u8; 20],
            round: RoundData {
                round_index: 4,
                round_start_time: 40_000,
                packing_index_of_round: packing_index,
                consensus_member_count: 4,
            },
        }
    }

    #[test]
    fn test_first_block_opens_voting() {
        let board = CandidateBoard::new();
        let h = header(10, 1, 0);
        assert_eq!(board.add_block(h.clone()), AddBlockOutcome::NewCandidate(h.clone()));
        assert_eq!(board.current_height(), 10);
        assert_eq!(board.voted_block_hash(), Some(h.hash()));
    }

    #[test]
    fn test_same_height_does_not_refire() {
        let board = CandidateBoard::new();
        board.add_block(header(10, 1, 0));
        assert_eq!(board.add_block(header(10, 1, 1)), AddBlockOutcome::Stored);
        assert_eq!(board.len(), 2);
    }

    #[test]
    fn test_higher_block_resets() {
        let board = CandidateBoard::new();
        board.add_block(header(10, 1, 0));
        board.add_block(header(10, 1, 1));

        let next = header(11, 2, 0);
        assert!(matches!(
            board.add_block(next.clone()),
            AddBlockOutcome::NewCandidate(_)
        ));
        assert_eq!(board.current_height(), 11);
        assert_eq!(board.len(), 1);
        assert!(board.get(&next.hash()).is_some());
    }

    #[test]
    fn test_lower_block_is_stale() {
        let board = CandidateBoard::new();
        board.add_block(header(10, 1, 0));
        assert_eq!(board.add_block(header(9, 1, 0)), AddBlockOutcome::Stale);
        assert_eq!(board.current_height(), 10);
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_clear_reopens_same_height() {
        let board = CandidateBoard::new();
        board.add_block(header(10, 1, 0));
        board.clear(false);
        assert!(board.voted_block_hash().is_none());
        assert_eq!(board.len(), 1);
        assert!(matches!(
            board.add_block(header(10, 1, 1)),
            AddBlockOutcome::NewCandidate(_)
        ));

        board.clear(true);
        assert!(board.is_empty());
    }

    #[test]
    fn test_finish_height_ignores_older_heights() {
        let board = CandidateBoard::new();
        board.add_block(header(10, 1, 0));
        board.add_block(header(11, 1, 0));

        assert!(!board.finish_height(10));
        assert!(board.voted_block_hash().is_some());
        assert!(board.finish_height(11));
        assert!(board.voted_block_hash().is_none());
    }

    #[test]
    fn test_next_voting_item_picks_lowest_matching_hash() {
        let board = CandidateBoard::new();
        let a = header(10, 1, 0);
        let b = header(10, 1, 1);
        let other_slot = header(10, 2, 2);
        board.add_block(a.clone());
        board.add_block(b.clone());
        board.add_block(other_slot);

        let expected = if a.hash() < b.hash() { a } else { b };
        assert_eq!(board.next_voting_item(10, 4, 1, 40_000), Some(expected));
        assert!(board.next_voting_item(10, 4, 3, 40_000).is_none());
        assert!(board.next_voting_item(10, 5, 1, 40_000).is_none());
        assert!(board.next_voting_item(11, 4, 1, 40_000).is_none());
    }
}
