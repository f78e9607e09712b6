//! Consensus configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use poc_consensus::ConsensusConfig;
//!
//! let config = ConsensusConfig::default()
//!     .with_chain_id(2)
//!     .with_byzantine_rate(75)
//!     .with_env_overrides();
//! config.validate()?;
//! ```

use crate::error::{ConsensusError, ConsensusResult};
use serde::{Deserialize, Serialize};
use shared_crypto::Secp256k1PublicKey;
use shared_types::{Address, ChainId};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Consensus configuration
///
/// Queue capacities bound every hand-off between worker tasks. Guard sizes
/// bound the duplicate-detection windows.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Chain this node votes on.
    pub chain_id: ChainId,
    /// Quorum threshold in percent. A stage completes once
    /// `votes * 100 > byzantine_rate_percent * member_count`.
    pub byzantine_rate_percent: u8,
    /// Seed node addresses; their votes are accepted even outside the round.
    pub seed_addresses: Vec<Address>,
    /// Seed node public keys (hex, compressed), announced on subnet join.
    pub seed_public_keys: Vec<String>,
    pub vote_queue_capacity: usize,
    pub stage_one_queue_capacity: usize,
    pub stage_two_queue_capacity: usize,
    pub result_queue_capacity: usize,
    pub packing_queue_capacity: usize,
    /// Window of the remote-vote duplicate guard.
    pub vote_guard_size: usize,
    /// Window of the result-message duplicate guard (keyed by block hash).
    pub result_guard_size: usize,
    /// Window of the stage-one-confirmed recorder.
    pub confirmed_guard_size: usize,
    /// Number of verified results kept to answer `getVoteResult` requests.
    pub result_cache_capacity: usize,
    /// Driver polling interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            byzantine_rate_percent: 66,
            seed_addresses: Vec::new(),
            seed_public_keys: Vec::new(),
            vote_queue_capacity: 10_000,
            stage_one_queue_capacity: 256,
            stage_two_queue_capacity: 256,
            result_queue_capacity: 256,
            packing_queue_capacity: 16,
            vote_guard_size: 10_000,
            result_guard_size: 1_000,
            confirmed_guard_size: 1_000,
            result_cache_capacity: 128,
            poll_interval_ms: 1_000,
        }
    }
}

impl ConsensusConfig {
    /// Default configuration overlaid with `POC_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Overlay `POC_CHAIN_ID`, `POC_BYZANTINE_RATE`, `POC_POLL_INTERVAL_MS`
    /// and `POC_VOTE_QUEUE_CAPACITY`. Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse("POC_CHAIN_ID") {
            self.chain_id = v;
        }
        if let Some(v) = env_parse("POC_BYZANTINE_RATE") {
            self.byzantine_rate_percent = v;
        }
        if let Some(v) = env_parse("POC_POLL_INTERVAL_MS") {
            self.poll_interval_ms = v;
        }
        if let Some(v) = env_parse("POC_VOTE_QUEUE_CAPACITY") {
            self.vote_queue_capacity = v;
        }
        self
    }

    /// Parse and validate a JSON document. Missing fields take their
    /// defaults.
    pub fn from_json(json: &str) -> ConsensusResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ConsensusError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration bounds
    pub fn validate(&self) -> ConsensusResult<()> {
        if !(1..=99).contains(&self.byzantine_rate_percent) {
            return Err(ConsensusError::InvalidConfig(format!(
                "byzantine_rate_percent must be within 1..=99, got {}",
                self.byzantine_rate_percent
            )));
        }

        let capacities = [
            ("vote_queue_capacity", self.vote_queue_capacity),
            ("stage_one_queue_capacity", self.stage_one_queue_capacity),
            ("stage_two_queue_capacity", self.stage_two_queue_capacity),
            ("result_queue_capacity", self.result_queue_capacity),
            ("packing_queue_capacity", self.packing_queue_capacity),
            ("vote_guard_size", self.vote_guard_size),
            ("result_guard_size", self.result_guard_size),
            ("confirmed_guard_size", self.confirmed_guard_size),
            ("result_cache_capacity", self.result_cache_capacity),
        ];
        for (name, value) in capacities {
            if value == 0 {
                return Err(ConsensusError::InvalidConfig(format!(
                    "{name} cannot be 0"
                )));
            }
        }

        if self.poll_interval_ms == 0 {
            return Err(ConsensusError::InvalidConfig(
                "poll_interval_ms cannot be 0".to_string(),
            ));
        }

        self.parsed_seed_public_keys()?;
        Ok(())
    }

    /// Decode the configured seed public keys.
    pub fn parsed_seed_public_keys(&self) -> ConsensusResult<Vec<Secp256k1PublicKey>> {
        self.seed_public_keys
            .iter()
            .map(|encoded| -> ConsensusResult<Secp256k1PublicKey> {
                let bytes = hex::decode(encoded).map_err(|e| {
                    ConsensusError::InvalidConfig(format!("seed public key {encoded}: {e}"))
                })?;
                let bytes: [u8; 33] = bytes.try_into().map_err(|_| {
                    ConsensusError::InvalidConfig(format!(
                        "seed public key {encoded} is not 33 bytes"
                    ))
                })?;
                Ok(Secp256k1PublicKey::from_bytes(bytes)?)
            })
            .collect()
    }

    /// True if the address belongs to a configured seed node.
    pub fn is_seed(&self, address: &Address) -> bool {
        self.seed_addresses.contains(address)
    }

    /// Driver polling interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Builder-style method to set the chain id
    pub fn with_chain_id(mut self, chain_id: ChainId) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Builder-style method to set the byzantine rate
    pub fn with_byzantine_rate(mut self, percent: u8) -> Self {
        self.byzantine_rate_percent = percent;
        self
    }

    /// Builder-style method to register seed nodes
    pub fn with_seeds(mut self, seeds: &[Secp256k1PublicKey]) -> Self {
        for key in seeds {
            self.seed_addresses.push(key.to_address());
            self.seed_public_keys.push(hex::encode(key.as_bytes()));
        }
        self
    }

    /// Builder-style method to set the driver polling interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Builder-style method to set the remote vote guard window
    pub fn with_vote_guard_size(mut self, size: usize) -> Self {
        self.vote_guard_size = size;
        self
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
