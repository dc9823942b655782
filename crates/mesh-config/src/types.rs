// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `mesh_registry.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MeshRegistryConfig {
    pub server: ServerConfig,
    pub health: HealthConfig,
    pub store: StoreConfig,
    pub leadership: LeadershipConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub service_name: String,
    /// Deadline applied to every request, in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            service_name: "mcp-mesh-registry".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Heartbeat thresholds and health sweep cadence
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Silence after which a healthy agent becomes degraded
    pub timeout_threshold_secs: u64,
    /// Silence after which an agent becomes unhealthy
    pub eviction_threshold_secs: u64,
    /// Extra time an unhealthy agent is retained before eviction
    pub eviction_grace_secs: u64,
    pub health_check_interval_secs: u64,
    /// Records handled per sweep chunk before yielding
    pub sweep_batch_size: usize,
    /// Run one sweep before serving to clean up records left by a previous process
    pub startup_cleanup: bool,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            timeout_threshold_secs: 60,
            eviction_threshold_secs: 120,
            eviction_grace_secs: 60,
            health_check_interval_secs: 30,
            sweep_batch_size: 256,
            startup_cleanup: true,
        }
    }
}

impl HealthConfig {
    pub fn timeout_threshold(&self) -> Duration {
        Duration::from_secs(self.timeout_threshold_secs)
    }

    pub fn eviction_threshold(&self) -> Duration {
        Duration::from_secs(self.eviction_threshold_secs)
    }

    pub fn eviction_grace(&self) -> Duration {
        Duration::from_secs(self.eviction_grace_secs)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }
}

/// Persistence backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

/// Agent record store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: String,
    /// Bound on every store call, in milliseconds
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            database_url: "mcp_mesh_registry.db".to_string(),
            timeout_ms: 2_000,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Lease-based leadership across registry replicas
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LeadershipConfig {
    /// When disabled this replica is always the authoritative writer
    pub enabled: bool,
    pub lease_ttl_secs: u64,
    pub replica_id: String,
}

impl Default for LeadershipConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            lease_ttl_secs: 15,
            replica_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl LeadershipConfig {
    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_ttl_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`
    pub format: String,
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file_path: None,
        }
    }
}
