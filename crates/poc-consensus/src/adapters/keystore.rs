//! Key custody adapter
//!
//! Implements the VoteSigner port over secp256k1 keypairs held in memory.

use crate::error::{ConsensusError, ConsensusResult};
use crate::ports::VoteSigner;
use parking_lot::RwLock;
use shared_crypto::{P2pkSignature, Secp256k1KeyPair, Secp256k1PublicKey};
use shared_types::{Address, Hash};
use std::collections::HashMap;

/// Signing keys indexed by account address.
#[derive(Default)]
pub struct InMemoryKeystore {
    keys: RwLock<HashMap<Address, Secp256k1KeyPair>>,
}

impl InMemoryKeystore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take custody of `keypair`. Returns its address.
    pub fn insert(&self, keypair: Secp256k1KeyPair) -> Address {
        let address = keypair.address();
        self.keys.write().insert(address, keypair);
        address
    }

    /// Generate and store a fresh key.
    pub fn generate(&self) -> Address {
        self.insert(Secp256k1KeyPair::generate())
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.keys.read().contains_key(address)
    }
}

impl VoteSigner for InMemoryKeystore {
    fn public_key(&self, address: &Address) -> Option<Secp256k1PublicKey> {
        self.keys.read().get(address).map(Secp256k1KeyPair::public_key)
    }

    fn sign(&self, address: &Address, hash: &Hash) -> ConsensusResult<P2pkSignature> {
        let keys = self.keys.read();
        let keypair = keys
            .get(address)
            .ok_or_else(|| ConsensusError::MissingKey(hex::encode(address)))?;
        Ok(keypair.sign_p2pk(hash)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::sha256;

    #[test]
    fn test_signs_with_held_key() {
        let store = InMemoryKeystore::new();
        let address = store.generate();
        let hash = sha256(b"pre-vote");

        let signature = store.sign(&address, &hash).unwrap();
        assert_eq!(signature.signer_address(), address);
        assert!(signature.verify(&hash).is_ok());
        assert_eq!(store.public_key(&address), Some(signature.public_key));
    }

    #[test]
    fn test_unknown_address() {
        let store = InMemoryKeystore::new();
        assert!(store.public_key(&[1u8; 20]).is_none());
        assert!(matches!(
            store.sign(&[1u8; 20], &[0u8; 32]),
            Err(ConsensusError::MissingKey(_))
        ));
    }
}
