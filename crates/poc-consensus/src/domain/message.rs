//! Vote and result messages, and their wire encoding.
//!
//! Wire structs are private: the domain types carry parsed keys and the
//! origin of a message, neither of which is serialized.

use super::target::{VoteStage, VotingTarget};
use crate::error::{ConsensusError, ConsensusResult};
use serde::{Deserialize, Serialize};
use shared_crypto::{Hash, P2pkSignature};
use shared_types::{Address, PeerId};

/// Gossip command for a single vote.
pub const CMD_VOTE: &str = "vote";
/// Gossip command for a pre-commit quorum proof.
pub const CMD_VOTE_RESULT: &str = "voteResult";
/// Point-to-point request for a cached result by block hash.
pub const CMD_GET_VOTE_RESULT: &str = "getVoteResult";

/// Key used to detect a vote seen twice: target, stage and signer.
pub type VoteKey = (VotingTarget, VoteStage, Address);

/// Where a vote entered this node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOrigin {
    /// Produced by this node's own signer.
    Local,
    /// Received from the given peer.
    Remote(PeerId),
}

impl VoteOrigin {
    pub fn is_remote(&self) -> bool {
        matches!(self, VoteOrigin::Remote(_))
    }
}

/// A single member's vote for a target at one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteMessage {
    pub target: VotingTarget,
    pub stage: VoteStage,
    pub signature: Option<P2pkSignature>,
    pub origin: VoteOrigin,
}

impl VoteMessage {
    /// An unsigned local vote.
    pub fn new(target: VotingTarget, stage: VoteStage) -> Self {
        Self {
            target,
            stage,
            signature: None,
            origin: VoteOrigin::Local,
        }
    }

    pub fn with_signature(mut self, signature: P2pkSignature) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn with_origin(mut self, origin: VoteOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// The hash the signer signs.
    pub fn signing_hash(&self) -> Hash {
        self.target.signing_hash(self.stage)
    }

    /// Address derived from the embedded public key.
    pub fn signer(&self) -> Option<Address> {
        self.signature.as_ref().map(P2pkSignature::signer_address)
    }

    pub fn key(&self, signer: Address) -> VoteKey {
        (self.target, self.stage, signer)
    }

    /// The peer this vote came from, if remote.
    pub fn peer(&self) -> Option<&PeerId> {
        match &self.origin {
            VoteOrigin::Local => None,
            VoteOrigin::Remote(peer) => Some(peer),
        }
    }

    pub fn encode(&self) -> ConsensusResult<Vec<u8>> {
        let wire = VoteWire {
            target: TargetWire::from(&self.target),
            stage: self.stage.as_u8(),
            signature: self
                .signature
                .as_ref()
                .map(P2pkSignature::to_bytes)
                .unwrap_or_default(),
        };
        Ok(bincode::serialize(&wire)?)
    }

    /// Decode a vote received from `peer`. An empty signature field decodes
    /// to an unsigned vote; a malformed one is an error.
    pub fn decode(bytes: &[u8], peer: PeerId) -> ConsensusResult<Self> {
        let wire: VoteWire = bincode::deserialize(bytes)?;
        let stage = parse_stage(wire.stage)?;
        let signature = if wire.signature.is_empty() {
            None
        } else {
            Some(P2pkSignature::from_bytes(&wire.signature)?)
        };
        Ok(Self {
            target: wire.target.into(),
            stage,
            signature,
            origin: VoteOrigin::Remote(peer),
        })
    }
}

/// Proof that a pre-commit quorum signed a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultMessage {
    pub target: VotingTarget,
    pub stage: VoteStage,
    pub signatures: Vec<P2pkSignature>,
}

impl ResultMessage {
    /// Collect the signatures of the given votes.
    pub fn from_votes<'a>(
        target: VotingTarget,
        stage: VoteStage,
        votes: impl IntoIterator<Item = &'a VoteMessage>,
    ) -> Self {
        Self {
            target,
            stage,
            signatures: votes.into_iter().filter_map(|v| v.signature).collect(),
        }
    }

    pub fn height(&self) -> u64 {
        self.target.height
    }

    pub fn block_hash(&self) -> Hash {
        self.target.block_hash
    }

    /// The hash every signature in this result must cover.
    pub fn signing_hash(&self) -> Hash {
        self.target.signing_hash(self.stage)
    }

    pub fn encode(&self) -> ConsensusResult<Vec<u8>> {
        let wire = ResultWire {
            target: TargetWire::from(&self.target),
            stage: self.stage.as_u8(),
            signatures: self.signatures.iter().map(P2pkSignature::to_bytes).collect(),
        };
        Ok(bincode::serialize(&wire)?)
    }

    pub fn decode(bytes: &[u8]) -> ConsensusResult<Self> {
        let wire: ResultWire = bincode::deserialize(bytes)?;
        let signatures = wire
            .signatures
            .iter()
            .map(|s| P2pkSignature::from_bytes(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            target: wire.target.into(),
            stage: parse_stage(wire.stage)?,
            signatures,
        })
    }
}

/// Payload of a `getVoteResult` request.
pub fn encode_result_request(block_hash: &Hash) -> ConsensusResult<Vec<u8>> {
    Ok(bincode::serialize(block_hash)?)
}

pub fn decode_result_request(bytes: &[u8]) -> ConsensusResult<Hash> {
    Ok(bincode::deserialize(bytes)?)
}

fn parse_stage(value: u8) -> ConsensusResult<VoteStage> {
    VoteStage::from_u8(value)
        .ok_or_else(|| ConsensusError::Malformed(format!("unknown vote stage {value}")))
}

#[derive(Serialize, Deserialize)]
struct TargetWire {
    height: u64,
    round_index: u64,
    round_start_time: u64,
    packing_index_of_round: u32,
    vote_round_index: u64,
    block_hash: Hash,
}

impl From<&VotingTarget> for TargetWire {
    fn from(t: &VotingTarget) -> Self {
        Self {
            height: t.height,
            round_index: t.round_index,
            round_start_time: t.round_start_time,
            packing_index_of_round: t.packing_index_of_round,
            vote_round_index: t.vote_round_index,
            block_hash: t.block_hash,
        }
    }
}

impl From<TargetWire> for VotingTarget {
    fn from(w: TargetWire) -> Self {
        Self {
            height: w.height,
            round_index: w.round_index,
            round_start_time: w.round_start_time,
            packing_index_of_round: w.packing_index_of_round,
            vote_round_index: w.vote_round_index,
            block_hash: w.block_hash,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct VoteWire {
    target: TargetWire,
    stage: u8,
    signature: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct ResultWire {
    target: TargetWire,
    stage: u8,
    signatures: Vec<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::target::FIRST_VOTE_ROUND;
    use shared_crypto::Secp256k1KeyPair;

    fn target() -> VotingTarget {
        VotingTarget {
            height: 42,
            round_index: 8,
            round_start_time: 80_000,
            packing_index_of_round: 1,
            vote_round_index: FIRST_VOTE_ROUND,
            block_hash: [0xAB; 32],
        }
    }

    fn signed_vote(keypair: &Secp256k1KeyPair, stage: VoteStage) -> VoteMessage {
        let vote = VoteMessage::new(target(), stage);
        let sig = keypair.sign_p2pk(&vote.signing_hash()).unwrap();
        vote.with_signature(sig)
    }

    #[test]
    fn test_decoded_vote_is_remote_and_verifies() {
        let keypair = Secp256k1KeyPair::generate();
        let vote = signed_vote(&keypair, VoteStage::PreVote);
        let peer = PeerId::new("10.0.0.2:8001");

        let decoded = VoteMessage::decode(&vote.encode().unwrap(), peer.clone()).unwrap();

        assert_eq!(decoded.origin, VoteOrigin::Remote(peer));
        assert_eq!(decoded.target, vote.target);
        assert_eq!(decoded.signer(), Some(keypair.address()));
        assert!(decoded
            .signature
            .unwrap()
            .verify(&decoded.signing_hash())
            .is_ok());
    }

    #[test]
    fn test_unsigned_vote_decodes_without_signature() {
        let vote = VoteMessage::new(target(), VoteStage::PreCommit);
        let decoded = VoteMessage::decode(&vote.encode().unwrap(), PeerId::new("p")).unwrap();
        assert!(decoded.signature.is_none());
        assert_eq!(decoded.stage, VoteStage::PreCommit);
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = VoteMessage::decode(&[1, 2, 3], PeerId::new("p")).unwrap_err();
        assert!(matches!(err, ConsensusError::Malformed(_)));
        assert!(ResultMessage::decode(&[0xFF; 4]).is_err());
    }

    #[test]
    fn test_result_collects_signatures() {
        let keys: Vec<_> = (0..3).map(|_| Secp256k1KeyPair::generate()).collect();
        let votes: Vec<_> = keys
            .iter()
            .map(|k| signed_vote(k, VoteStage::PreCommit))
            .collect();

        let result = ResultMessage::from_votes(target(), VoteStage::PreCommit, &votes);
        let decoded = ResultMessage::decode(&result.encode().unwrap()).unwrap();

        assert_eq!(decoded, result);
        assert_eq!(decoded.signatures.len(), 3);
        for sig in &decoded.signatures {
            assert!(sig.verify(&decoded.signing_hash()).is_ok());
        }
    }

    #[test]
    fn test_result_request_payload() {
        let hash = [9u8; 32];
        let bytes = encode_result_request(&hash).unwrap();
        assert_eq!(decode_result_request(&bytes).unwrap(), hash);
    }
}
