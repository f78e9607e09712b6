//! # Shared Crypto - Consensus Signing Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256 | Vote signing hashes, address derivation |
//! | `ecdsa` | secp256k1 | Vote signatures with embedded public key |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic, low-S normalization
//! - **Addresses**: derived from the signer's public key, never trusted from the wire

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod hashing;

// Re-exports
pub use ecdsa::{
    Address, P2pkSignature, Secp256k1KeyPair, Secp256k1PublicKey, Secp256k1Signature,
    P2PK_SIGNATURE_LEN,
};
pub use errors::CryptoError;
pub use hashing::{sha256, sha256_many, Hash, Sha256Hasher};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
