// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Checks value ranges and cross-field consistency. Every violation is
//! collected so an operator sees all problems in one run.

use crate::{ConfigError, ConfigResult, MeshRegistryConfig, StoreBackend};

/// Upper bound for `health.timeout_threshold_secs` (2 hours)
pub const MAX_TIMEOUT_THRESHOLD_SECS: u64 = 7_200;
/// Upper bound for `health.eviction_threshold_secs` (4 hours)
pub const MAX_EVICTION_THRESHOLD_SECS: u64 = 14_400;
/// Renewal runs at ttl/3, so anything shorter cannot renew on whole seconds
pub const MIN_LEASE_TTL_SECS: u64 = 3;

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    OutOfRange { field: String, value: u64, min: u64, max: u64 },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::OutOfRange {
                field,
                value,
                min,
                max,
            } => {
                write!(f, "{} = {} is outside valid range ({}-{})", field, value, min, max)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every violation
pub fn validate_config(config: &MeshRegistryConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_server(config, &mut errors);
    validate_health(config, &mut errors);
    validate_store(config, &mut errors);
    validate_leadership(config, &mut errors);
    validate_logging(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn check_range(
    errors: &mut Vec<ConfigValidationError>,
    field: &str,
    value: u64,
    min: u64,
    max: u64,
) {
    if value < min || value > max {
        errors.push(ConfigValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
}

fn validate_server(config: &MeshRegistryConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.server.port == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "server.port".to_string(),
            reason: "port 0 is not allowed".to_string(),
        });
    }
    if config.server.host.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "server.host".to_string(),
        });
    }
    if config.server.request_timeout_ms == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "server.request_timeout_ms".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
}

fn validate_health(config: &MeshRegistryConfig, errors: &mut Vec<ConfigValidationError>) {
    let health = &config.health;
    check_range(
        errors,
        "health.timeout_threshold_secs",
        health.timeout_threshold_secs,
        1,
        MAX_TIMEOUT_THRESHOLD_SECS,
    );
    check_range(
        errors,
        "health.eviction_threshold_secs",
        health.eviction_threshold_secs,
        1,
        MAX_EVICTION_THRESHOLD_SECS,
    );
    if health.eviction_threshold_secs <= health.timeout_threshold_secs {
        errors.push(ConfigValidationError::InvalidValue {
            field: "health.eviction_threshold_secs".to_string(),
            reason: format!(
                "must be greater than health.timeout_threshold_secs ({})",
                health.timeout_threshold_secs
            ),
        });
    }
    if health.health_check_interval_secs == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "health.health_check_interval_secs".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if health.sweep_batch_size == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "health.sweep_batch_size".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
}

fn validate_store(config: &MeshRegistryConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.store.timeout_ms == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "store.timeout_ms".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if config.store.backend == StoreBackend::Sqlite && config.store.database_url.trim().is_empty()
    {
        errors.push(ConfigValidationError::MissingRequired {
            field: "store.database_url".to_string(),
        });
    }
}

fn validate_leadership(config: &MeshRegistryConfig, errors: &mut Vec<ConfigValidationError>) {
    if !config.leadership.enabled {
        return;
    }
    if config.leadership.lease_ttl_secs < MIN_LEASE_TTL_SECS {
        errors.push(ConfigValidationError::InvalidValue {
            field: "leadership.lease_ttl_secs".to_string(),
            reason: format!("must be at least {}", MIN_LEASE_TTL_SECS),
        });
    }
    if config.leadership.replica_id.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "leadership.replica_id".to_string(),
        });
    }
}

fn validate_logging(config: &MeshRegistryConfig, errors: &mut Vec<ConfigValidationError>) {
    if !matches!(config.logging.format.as_str(), "text" | "json") {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.format".to_string(),
            reason: format!("expected 'text' or 'json', got '{}'", config.logging.format),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eviction_must_exceed_timeout() {
        let mut config = MeshRegistryConfig::default();
        config.health.timeout_threshold_secs = 120;
        config.health.eviction_threshold_secs = 120;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("health.eviction_threshold_secs"));
    }

    #[test]
    fn test_threshold_ranges() {
        let mut config = MeshRegistryConfig::default();
        config.health.timeout_threshold_secs = 0;
        config.health.eviction_threshold_secs = MAX_EVICTION_THRESHOLD_SECS + 1;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("health.timeout_threshold_secs = 0"));
        assert!(err.contains("health.eviction_threshold_secs = 14401"));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = MeshRegistryConfig::default();
        config.server.port = 0;
        config.health.sweep_batch_size = 0;
        config.logging.format = "xml".to_string();

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("server.port"));
        assert!(err.contains("health.sweep_batch_size"));
        assert!(err.contains("logging.format"));
    }

    #[test]
    fn test_sqlite_requires_database_url() {
        let mut config = MeshRegistryConfig::default();
        config.store.backend = StoreBackend::Sqlite;
        config.store.database_url = String::new();

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_lease_ttl_only_checked_when_enabled() {
        let mut config = MeshRegistryConfig::default();
        config.leadership.lease_ttl_secs = 1;
        assert!(validate_config(&config).is_ok());

        config.leadership.enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
