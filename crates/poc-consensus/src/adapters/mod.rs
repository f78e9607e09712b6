//! Adapters layer
//!
//! In-process implementations of the ports that need no I/O. Hosts plug in
//! their own network, round and assembly adapters.

pub mod block_pipeline;
pub mod chain_status;
pub mod keystore;

pub use block_pipeline::{ConfirmedBlock, InMemoryBlockPipeline};
pub use chain_status::SharedChainStatus;
pub use keystore::InMemoryKeystore;
