//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check binding names are present and unique
//! - Check SERVICE bindings carry a usable upstream and others do not
//! - Validate addresses and limits
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BridgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use url::Url;

use crate::bindings::Module;
use crate::config::schema::BridgeConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid {field} '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("codec.max_header_bytes must be greater than zero")]
    ZeroHeaderLimit,

    #[error("binding #{index} has an empty name")]
    EmptyBindingName { index: usize },

    #[error("duplicate binding name '{0}'")]
    DuplicateBinding(String),

    #[error("SERVICE binding '{0}' requires an upstream")]
    MissingUpstream(String),

    #[error("binding '{name}' has an invalid upstream '{upstream}': {reason}")]
    InvalidUpstream {
        name: String,
        upstream: String,
        reason: String,
    },

    #[error("binding '{name}' is {module}; only SERVICE bindings take an upstream")]
    UnexpectedUpstream { name: String, module: Module },

    #[error("D1 binding '{0}' cannot be hosted from a config file")]
    UnsupportedModule(String),
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }
    if config.codec.max_header_bytes == 0 {
        errors.push(ValidationError::ZeroHeaderLimit);
    }

    let mut seen = HashSet::new();
    for (index, binding) in config.bindings.iter().enumerate() {
        if binding.name.trim().is_empty() {
            errors.push(ValidationError::EmptyBindingName { index });
            continue;
        }
        if !seen.insert(binding.name.as_str()) {
            errors.push(ValidationError::DuplicateBinding(binding.name.clone()));
        }

        match (binding.module, binding.upstream.as_deref()) {
            (Module::Service, None) => {
                errors.push(ValidationError::MissingUpstream(binding.name.clone()));
            }
            (Module::Service, Some(upstream)) => {
                if let Err(reason) = check_upstream(upstream) {
                    errors.push(ValidationError::InvalidUpstream {
                        name: binding.name.clone(),
                        upstream: upstream.to_string(),
                        reason,
                    });
                }
            }
            (module, Some(_)) => {
                errors.push(ValidationError::UnexpectedUpstream {
                    name: binding.name.clone(),
                    module,
                });
            }
            (_, None) => {}
        }

        if binding.module == Module::D1 {
            errors.push(ValidationError::UnsupportedModule(binding.name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_upstream(upstream: &str) -> Result<(), String> {
    let url = Url::parse(upstream).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("scheme '{}' is not supported", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::BindingConfig;

    fn binding(name: &str, module: Module, upstream: Option<&str>) -> BindingConfig {
        BindingConfig {
            name: name.to_string(),
            module,
            upstream: upstream.map(str::to_string),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&BridgeConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = BridgeConfig::default();
        config.codec.max_header_bytes = 0;
        config.bindings = vec![
            binding("BUCKET", Module::R2, None),
            binding("BUCKET", Module::Kv, None),
            binding("", Module::Queue, None),
            binding("API", Module::Service, None),
            binding("BAD_API", Module::Service, Some("ftp://host")),
            binding("CACHE", Module::Kv, Some("http://127.0.0.1:1")),
            binding("DB", Module::D1, None),
        ];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 7);
        assert!(errors.contains(&ValidationError::ZeroHeaderLimit));
        assert!(errors.contains(&ValidationError::DuplicateBinding("BUCKET".into())));
        assert!(errors.contains(&ValidationError::EmptyBindingName { index: 2 }));
        assert!(errors.contains(&ValidationError::MissingUpstream("API".into())));
        assert!(errors.contains(&ValidationError::UnsupportedModule("DB".into())));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidUpstream { name, .. } if name == "BAD_API")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::UnexpectedUpstream { module: Module::Kv, .. })));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = BridgeConfig::default();
        config.observability.metrics_address = "not an address".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].to_string(), "invalid observability.metrics_address 'not an address'");
    }
}
