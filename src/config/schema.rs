//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bridge.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::bindings::Module;
use crate::codec::DEFAULT_MAX_HEADER_BYTES;

/// Root configuration for the binding bridge.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Dispatch header codec limits.
    pub codec: CodecConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Bindings hosted by this bridge.
    pub bindings: Vec<BindingConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8787").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8787".to_string(),
        }
    }
}

/// Codec configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CodecConfig {
    /// Largest encoded dispatch header accepted or produced.
    pub max_header_bytes: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// One hosted binding.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BindingConfig {
    /// Name clients send in `X-BRIDGE-BINDING-NAME`.
    pub name: String,

    pub module: Module,

    /// Origin a SERVICE binding forwards to (e.g., "http://127.0.0.1:8788").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_empty_document() {
        let config: BridgeConfig = toml::from_str("").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.listener.bind_address, "127.0.0.1:8787");
        assert_eq!(config.codec.max_header_bytes, 16 * 1024);
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_bindings_table_array() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [[bindings]]
            name = "BUCKET"
            module = "R2"

            [[bindings]]
            name = "API"
            module = "SERVICE"
            upstream = "http://127.0.0.1:8788"
            "#,
        )
        .unwrap();
        assert_eq!(config.bindings.len(), 2);
        assert_eq!(config.bindings[0].module, Module::R2);
        assert_eq!(config.bindings[1].upstream.as_deref(), Some("http://127.0.0.1:8788"));
    }

    #[test]
    fn test_unknown_module_is_a_parse_error() {
        let result: Result<BridgeConfig, _> = toml::from_str(
            r#"
            [[bindings]]
            name = "X"
            module = "r2"
            "#,
        );
        assert!(result.is_err());
    }
}
