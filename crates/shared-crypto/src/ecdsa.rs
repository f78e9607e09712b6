//! # ECDSA Signatures (secp256k1)
//!
//! Signing and verification for consensus votes.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S normalized signatures
//! - Signatures are produced over a 32-byte prehash, never raw messages
//!
//! ## Signature bundle
//!
//! Votes carry a [`P2pkSignature`]: the signer's compressed public key next
//! to the 64-byte `r||s` signature. The signer address is derived from the
//! embedded key, so it never travels on the wire.

use crate::hashing::{sha256, Hash};
use crate::CryptoError;
use k256::ecdsa::{
    signature::hazmat::{PrehashSigner, PrehashVerifier},
    Signature, SigningKey, VerifyingKey,
};
use zeroize::Zeroizing;

/// A 20-byte account address.
pub type Address = [u8; 20];

/// Length of a serialized [`P2pkSignature`].
pub const P2PK_SIGNATURE_LEN: usize = 33 + 64;

/// Compressed secp256k1 public key (33 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Secp256k1PublicKey([u8; 33]);

impl Secp256k1PublicKey {
    /// Create from compressed bytes (33 bytes, starting with 0x02 or 0x03).
    pub fn from_bytes(bytes: [u8; 33]) -> Result<Self, CryptoError> {
        VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Get raw compressed bytes.
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    /// Verify a signature over a 32-byte prehash.
    pub fn verify_prehash(
        &self,
        hash: &Hash,
        signature: &Secp256k1Signature,
    ) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig = Signature::from_slice(&signature.0).map_err(|_| CryptoError::InvalidSignature)?;

        verifying_key
            .verify_prehash(hash, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }

    /// Derive the account address: the last 20 bytes of SHA-256(pubkey).
    pub fn to_address(&self) -> Address {
        let digest = sha256(&self.0);
        let mut address = [0u8; 20];
        address.copy_from_slice(&digest[12..]);
        address
    }
}

/// ECDSA signature (64 bytes, r||s format).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Secp256k1Signature([u8; 64]);

impl Secp256k1Signature {
    /// Create from bytes (64 bytes).
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

/// A signature together with the public key that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct P2pkSignature {
    /// Signer's compressed public key.
    pub public_key: Secp256k1PublicKey,
    /// Signature over the message hash.
    pub signature: Secp256k1Signature,
}

impl P2pkSignature {
    /// Serialize as `pubkey(33) || r||s(64)`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(P2PK_SIGNATURE_LEN);
        out.extend_from_slice(self.public_key.as_bytes());
        out.extend_from_slice(self.signature.as_bytes());
        out
    }

    /// Parse from the `to_bytes` layout, validating the public key point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != P2PK_SIGNATURE_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: P2PK_SIGNATURE_LEN,
                actual: bytes.len(),
            });
        }
        let mut pk = [0u8; 33];
        pk.copy_from_slice(&bytes[..33]);
        let mut sig = [0u8; 64];
        sig.copy_from_slice(&bytes[33..]);
        Ok(Self {
            public_key: Secp256k1PublicKey::from_bytes(pk)?,
            signature: Secp256k1Signature::from_bytes(sig),
        })
    }

    /// Address of the signer, derived from the embedded public key.
    pub fn signer_address(&self) -> Address {
        self.public_key.to_address()
    }

    /// Verify the signature against a message hash.
    pub fn verify(&self, hash: &Hash) -> Result<(), CryptoError> {
        self.public_key.verify_prehash(hash, &self.signature)
    }
}

/// secp256k1 ECDSA keypair.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Get public key (compressed, 33 bytes).
    pub fn public_key(&self) -> Secp256k1PublicKey {
        let point = self.signing_key.verifying_key().to_encoded_point(true);
        // SEC1 compressed encoding is always 33 bytes.
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(point.as_bytes());
        Secp256k1PublicKey(bytes)
    }

    /// Account address of this keypair.
    pub fn address(&self) -> Address {
        self.public_key().to_address()
    }

    /// Sign a 32-byte message hash (deterministic RFC 6979).
    pub fn sign_prehash(&self, hash: &Hash) -> Result<Secp256k1Signature, CryptoError> {
        let sig: Signature = self
            .signing_key
            .sign_prehash(hash)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
        let bytes: [u8; 64] = sig.to_bytes().into();
        Ok(Secp256k1Signature(bytes))
    }

    /// Sign a message hash and bundle the public key with the signature.
    pub fn sign_p2pk(&self, hash: &Hash) -> Result<P2pkSignature, CryptoError> {
        Ok(P2pkSignature {
            public_key: self.public_key(),
            signature: self.sign_prehash(hash)?,
        })
    }

    /// Secret key bytes, wiped when the returned buffer is dropped.
    ///
    /// `SigningKey` clears its own scalar on drop.
    pub fn to_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing_key.to_bytes().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = Secp256k1KeyPair::generate();
        let hash = sha256(b"vote");

        let bundle = keypair.sign_p2pk(&hash).unwrap();
        assert!(bundle.verify(&hash).is_ok());
        assert_eq!(bundle.signer_address(), keypair.address());
    }

    #[test]
    fn test_wrong_hash_fails() {
        let keypair = Secp256k1KeyPair::generate();

        let bundle = keypair.sign_p2pk(&sha256(b"message1")).unwrap();
        let result = bundle.verify(&sha256(b"message2"));

        assert!(matches!(result, Err(CryptoError::SignatureVerificationFailed)));
    }

    #[test]
    fn test_deterministic_signatures() {
        let keypair = Secp256k1KeyPair::from_bytes([0xABu8; 32]).unwrap();
        let hash = sha256(b"deterministic test");

        let sig1 = keypair.sign_prehash(&hash).unwrap();
        let sig2 = keypair.sign_prehash(&hash).unwrap();

        assert_eq!(sig1.as_bytes(), sig2.as_bytes());
    }

    #[test]
    fn test_secret_bytes_restore_keypair() {
        let keypair = Secp256k1KeyPair::from_bytes([0x22u8; 32]).unwrap();
        let secret = keypair.to_bytes();
        assert_eq!(*secret, [0x22u8; 32]);

        let restored = Secp256k1KeyPair::from_bytes(*secret).unwrap();
        assert_eq!(restored.public_key(), keypair.public_key());
    }

    #[test]
    fn test_bundle_bytes_layout() {
        let keypair = Secp256k1KeyPair::from_bytes([0x11u8; 32]).unwrap();
        let bundle = keypair.sign_p2pk(&sha256(b"layout")).unwrap();

        let bytes = bundle.to_bytes();
        assert_eq!(bytes.len(), P2PK_SIGNATURE_LEN);
        assert_eq!(P2pkSignature::from_bytes(&bytes).unwrap(), bundle);
    }

    #[test]
    fn test_bundle_rejects_bad_length_and_point() {
        assert!(matches!(
            P2pkSignature::from_bytes(&[0u8; 10]),
            Err(CryptoError::InvalidKeyLength { .. })
        ));
        assert!(matches!(
            P2pkSignature::from_bytes(&[0u8; P2PK_SIGNATURE_LEN]),
            Err(CryptoError::InvalidPublicKey)
        ));
    }

    #[test]
    fn test_forged_key_swap_fails() {
        let honest = Secp256k1KeyPair::generate();
        let forger = Secp256k1KeyPair::generate();
        let hash = sha256(b"block");

        let mut bundle = honest.sign_p2pk(&hash).unwrap();
        bundle.public_key = forger.public_key();

        assert!(bundle.verify(&hash).is_err());
    }
}
