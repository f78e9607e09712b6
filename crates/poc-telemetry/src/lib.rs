//! # PoC Telemetry
//!
//! Structured logging for proof-of-credit consensus nodes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use poc_telemetry::{init_tracing, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_tracing(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `POC_SERVICE_NAME` | `poc-consensus` | Service name in the startup line |
//! | `POC_NODE_LABEL` | unset | Node label appended to the service name |
//! | `POC_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` overrides) |
//! | `POC_LOG_JSON` | `false` | JSON formatted output |

#![warn(missing_docs)]

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::{init_test_tracing, init_tracing};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The log filter directive could not be parsed
    #[error("Invalid log filter: {0}")]
    Filter(String),

    /// A global subscriber was already installed
    #[error("Tracing already initialized: {0}")]
    AlreadyInitialized(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_tracing_is_idempotent() {
        init_test_tracing();
        init_test_tracing();
    }
}
