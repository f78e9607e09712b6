//! # Shared Types Crate
//!
//! Chain entities shared between the consensus core and its collaborators
//! (round computation, block assembly, the block pipeline, networking).
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every cross-crate type is defined here.
//! - **Consensus view only**: headers carry just the fields voting needs;
//!   transactions and state stay with the block assembler.

pub mod entities;

pub use entities::*;
