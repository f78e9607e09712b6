//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for log output.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line
    pub service_name: String,

    /// Node label, appended to the service name when set
    pub node_label: Option<String>,

    /// Log level filter (trace, debug, info, warn, error) or a full directive
    pub log_level: String,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Whether to include thread ids (useful with several worker tasks)
    pub thread_ids: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "poc-consensus".to_string(),
            node_label: None,
            log_level: "info".to_string(),
            json_logs: false,
            thread_ids: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `POC_SERVICE_NAME`: Service name (default: poc-consensus)
    /// - `POC_NODE_LABEL`: Node label (default: unset)
    /// - `POC_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `POC_LOG_JSON`: Enable JSON logs (default: false)
    pub fn from_env() -> Self {
        Self {
            service_name: env::var("POC_SERVICE_NAME")
                .unwrap_or_else(|_| "poc-consensus".to_string()),

            node_label: env::var("POC_NODE_LABEL").ok(),

            log_level: env::var("POC_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("POC_LOG_JSON")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),

            thread_ids: false,
        }
    }

    /// Configuration for a labelled node (e.g. one of several in-process nodes).
    pub fn for_node(label: &str) -> Self {
        let mut config = Self::from_env();
        config.node_label = Some(label.to_string());
        config
    }

    /// Get the full service name including the node label.
    pub fn full_service_name(&self) -> String {
        match &self.node_label {
            Some(label) => format!("{}-{}", self.service_name, label),
            None => self.service_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "poc-consensus");
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_full_service_name() {
        let mut config = TelemetryConfig::default();
        assert_eq!(config.full_service_name(), "poc-consensus");

        config.node_label = Some("node-2".to_string());
        assert_eq!(config.full_service_name(), "poc-consensus-node-2");
    }
}
