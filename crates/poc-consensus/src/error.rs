//! Error types for the consensus core.

use shared_crypto::CryptoError;
use std::fmt;

/// Why an inbound vote or result was dropped.
///
/// Rejections are expected traffic on an open network: they are logged at
/// debug level and counted, never propagated to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// This node is not a member of the active round.
    NotParticipant,
    /// The vote carries no signature.
    MissingSignature,
    /// The vote targets a height at or below the best local height.
    StaleHeight,
    /// Already seen.
    Duplicate,
    /// Signer is neither a seed nor an active round member.
    UnknownSigner,
    /// Signature does not verify against the signing hash.
    BadSignature,
    /// Result message has no signatures.
    EmptySignatures,
    /// Result height is not exactly best height + 1.
    WrongHeight,
    /// Result references no block.
    EmptyBlockHash,
    /// Result was not produced at the pre-commit stage.
    WrongStage,
    /// Distinct valid signers do not exceed the byzantine rate.
    InsufficientQuorum,
    /// Stage result belongs to a slot older than the last confirmed one.
    StaleRound,
    /// The block's packer is not a member of its round.
    UnknownPacker,
    /// No stored candidate matches the block's slot.
    NoCandidate,
    /// Payload could not be decoded.
    Malformed,
}

impl Rejection {
    /// Every rejection reason, in counter order.
    pub const ALL: [Rejection; 15] = [
        Rejection::NotParticipant,
        Rejection::MissingSignature,
        Rejection::StaleHeight,
        Rejection::Duplicate,
        Rejection::UnknownSigner,
        Rejection::BadSignature,
        Rejection::EmptySignatures,
        Rejection::WrongHeight,
        Rejection::EmptyBlockHash,
        Rejection::WrongStage,
        Rejection::InsufficientQuorum,
        Rejection::StaleRound,
        Rejection::UnknownPacker,
        Rejection::NoCandidate,
        Rejection::Malformed,
    ];

    /// Position of this reason in [`Rejection::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable label used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Rejection::NotParticipant => "not_participant",
            Rejection::MissingSignature => "missing_signature",
            Rejection::StaleHeight => "stale_height",
            Rejection::Duplicate => "duplicate",
            Rejection::UnknownSigner => "unknown_signer",
            Rejection::BadSignature => "bad_signature",
            Rejection::EmptySignatures => "empty_signatures",
            Rejection::WrongHeight => "wrong_height",
            Rejection::EmptyBlockHash => "empty_block_hash",
            Rejection::WrongStage => "wrong_stage",
            Rejection::InsufficientQuorum => "insufficient_quorum",
            Rejection::StaleRound => "stale_round",
            Rejection::UnknownPacker => "unknown_packer",
            Rejection::NoCandidate => "no_candidate",
            Rejection::Malformed => "malformed",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consensus error types
#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    #[error("Message rejected: {0}")]
    Rejected(Rejection),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Round {round_index} starting at {round_start_time} unavailable: {reason}")]
    RoundUnavailable {
        round_index: u64,
        round_start_time: u64,
        reason: String,
    },

    #[error("Block assembly failed: {0}")]
    AssemblyFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Block pipeline error: {0}")]
    Pipeline(String),

    #[error("No signing key for address {0}")]
    MissingKey(String),

    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),
}

impl From<Rejection> for ConsensusError {
    fn from(rejection: Rejection) -> Self {
        ConsensusError::Rejected(rejection)
    }
}

impl From<bincode::Error> for ConsensusError {
    fn from(err: bincode::Error) -> Self {
        ConsensusError::Malformed(err.to_string())
    }
}

/// Result type for consensus operations
pub type ConsensusResult<T> = Result<T, ConsensusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_index_matches_table() {
        for (i, reason) in Rejection::ALL.iter().enumerate() {
            assert_eq!(reason.index(), i);
        }
    }

    #[test]
    fn test_rejection_converts_into_error() {
        let err: ConsensusError = Rejection::Duplicate.into();
        assert!(matches!(err, ConsensusError::Rejected(Rejection::Duplicate)));
        assert_eq!(err.to_string(), "Message rejected: duplicate");
    }
}
