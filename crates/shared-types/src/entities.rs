//! # Core Domain Entities
//!
//! The chain-level entities the consensus core consumes from its
//! collaborators. Blocks are assembled and stored elsewhere; only the header
//! fields that matter for voting live here.
//!
//! ## Clusters
//!
//! - **Primitives**: `Hash`, `Address`, `ChainId`
//! - **Chain**: `BlockHeader`, `RoundData`
//! - **Networking**: `NodeId`, `PeerId`

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

// =============================================================================
// PRIMITIVES
// =============================================================================

/// A 32-byte hash (SHA-256).
pub type Hash = [u8; 32];

/// A 20-byte account address, derived from a compressed public key.
pub type Address = [u8; 20];

/// Identifier of the chain a consensus message belongs to.
pub type ChainId = u16;

/// The all-zero hash, used as "no block".
pub const ZERO_HASH: Hash = [0u8; 32];

/// Returns true if the hash carries no block reference.
pub fn is_empty_hash(hash: &Hash) -> bool {
    hash == &ZERO_HASH
}

// =============================================================================
// NETWORKING
// =============================================================================

/// Unique identifier for a node in the network.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default, PartialOrd, Ord)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a node id from any string-like peer label (e.g. `ip:port`).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A peer identifier (alias for `NodeId` in peer contexts).
pub type PeerId = NodeId;

// =============================================================================
// THE CHAIN
// =============================================================================

/// Round metadata embedded in every block by its packer.
///
/// A voter only accepts a block whose embedded round matches the round it
/// computes locally for the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct RoundData {
    /// Index of the packing round.
    pub round_index: u64,
    /// Start of the round, unix millis.
    pub round_start_time: u64,
    /// 1-based slot of the packer within the round.
    pub packing_index_of_round: u32,
    /// Number of members in the round when the block was packed.
    pub consensus_member_count: u32,
}

/// The header of a block as seen by consensus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockHeader {
    /// Block height in the chain.
    pub height: u64,
    /// Hash of the parent block.
    pub parent_hash: Hash,
    /// Merkle root of all transactions in the block.
    pub merkle_root: Hash,
    /// Unix millis when the block was packed.
    pub timestamp: u64,
    /// Address of the member that packed this block.
    pub packer: Address,
    /// Round metadata the packer claims for this block.
    pub round: RoundData,
}

impl BlockHeader {
    /// SHA-256 over the header fields in a fixed little-endian layout.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.height.to_le_bytes());
        hasher.update(self.parent_hash);
        hasher.update(self.merkle_root);
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.packer);
        hasher.update(self.round.round_index.to_le_bytes());
        hasher.update(self.round.round_start_time.to_le_bytes());
        hasher.update(self.round.packing_index_of_round.to_le_bytes());
        hasher.update(self.round.consensus_member_count.to_le_bytes());
        hasher.finalize().into()
    }

    /// True if this header's embedded round matches the given slot identity.
    pub fn matches_slot(&self, round_index: u64, round_start_time: u64, packing_index: u32) -> bool {
        self.round.round_index == round_index
            && self.round.round_start_time == round_start_time
            && self.round.packing_index_of_round == packing_index
    }
}
