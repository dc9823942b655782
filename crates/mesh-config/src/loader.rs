// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Loading happens in tiers, later tiers winning:
//! 1. Built-in defaults
//! 2. TOML file
//! 3. Environment variables
//! 4. CLI arguments

use crate::{ConfigError, ConfigResult, MeshRegistryConfig, StoreBackend};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "mesh_registry.toml";

/// Find the registry configuration file
///
/// Search order:
/// 1. `MESH_REGISTRY_CONFIG` environment variable
/// 2. Current working directory: `./mesh_registry.toml`
///
/// Returns `Ok(None)` when no file exists; the registry runs on defaults
/// in that case.
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if `MESH_REGISTRY_CONFIG` names a
/// file that does not exist
pub fn find_config_file() -> ConfigResult<Option<PathBuf>> {
    if let Ok(env_path) = env::var("MESH_REGISTRY_CONFIG") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by MESH_REGISTRY_CONFIG not found: {}",
            path.display()
        )));
    }

    if let Ok(cwd) = env::current_dir() {
        let candidate = cwd.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Ok(Some(candidate));
        }
    }

    Ok(None)
}

/// Load configuration
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, the file is searched for.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if an explicit config file is missing or contains invalid TOML.
/// Validation is a separate step (`validate_config`).
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<MeshRegistryConfig> {
    let config_file = match config_path {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.display().to_string()));
            }
            Some(path.to_path_buf())
        }
        None => find_config_file()?,
    };

    let mut config = match config_file {
        Some(path) => {
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content)?
        }
        None => MeshRegistryConfig::default(),
    };

    apply_environment_overrides(&mut config);

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

fn parse_bool(value: &str) -> bool {
    let value = value.to_lowercase();
    value == "true" || value == "1" || value == "yes"
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `HOST` -> `server.host`
/// - `PORT` -> `server.port`
/// - `REQUEST_TIMEOUT_MS` -> `server.request_timeout_ms`
/// - `DEFAULT_TIMEOUT_THRESHOLD` -> `health.timeout_threshold_secs`
/// - `DEFAULT_EVICTION_THRESHOLD` -> `health.eviction_threshold_secs`
/// - `EVICTION_GRACE_PERIOD` -> `health.eviction_grace_secs`
/// - `HEALTH_CHECK_INTERVAL` -> `health.health_check_interval_secs`
/// - `STORE_BACKEND` -> `store.backend`
/// - `DATABASE_URL` -> `store.database_url`
/// - `STORE_TIMEOUT_MS` -> `store.timeout_ms`
/// - `LEADERSHIP_ENABLED` -> `leadership.enabled`
/// - `REPLICA_ID` -> `leadership.replica_id`
/// - `MCP_MESH_LOG_LEVEL` -> `logging.level`
/// - `MCP_MESH_DEBUG_MODE` -> forces `logging.level = "debug"`
/// - `MCP_MESH_LOG_FILE` -> `logging.file_path`
///
/// Values that fail to parse are ignored.
pub fn apply_environment_overrides(config: &mut MeshRegistryConfig) {
    // Server
    if let Ok(value) = env::var("HOST") {
        config.server.host = value;
    }
    if let Ok(value) = env::var("PORT") {
        if let Ok(port) = value.parse::<u16>() {
            config.server.port = port;
        }
    }
    if let Ok(value) = env::var("REQUEST_TIMEOUT_MS") {
        if let Ok(ms) = value.parse::<u64>() {
            config.server.request_timeout_ms = ms;
        }
    }

    // Health
    if let Ok(value) = env::var("DEFAULT_TIMEOUT_THRESHOLD") {
        if let Ok(secs) = value.parse::<u64>() {
            config.health.timeout_threshold_secs = secs;
        }
    }
    if let Ok(value) = env::var("DEFAULT_EVICTION_THRESHOLD") {
        if let Ok(secs) = value.parse::<u64>() {
            config.health.eviction_threshold_secs = secs;
        }
    }
    if let Ok(value) = env::var("EVICTION_GRACE_PERIOD") {
        if let Ok(secs) = value.parse::<u64>() {
            config.health.eviction_grace_secs = secs;
        }
    }
    if let Ok(value) = env::var("HEALTH_CHECK_INTERVAL") {
        if let Ok(secs) = value.parse::<u64>() {
            config.health.health_check_interval_secs = secs;
        }
    }

    // Store
    if let Ok(value) = env::var("STORE_BACKEND") {
        if let Ok(backend) = value.parse::<StoreBackend>() {
            config.store.backend = backend;
        }
    }
    if let Ok(value) = env::var("DATABASE_URL") {
        config.store.database_url = value;
    }
    if let Ok(value) = env::var("STORE_TIMEOUT_MS") {
        if let Ok(ms) = value.parse::<u64>() {
            config.store.timeout_ms = ms;
        }
    }

    // Leadership
    if let Ok(value) = env::var("LEADERSHIP_ENABLED") {
        config.leadership.enabled = parse_bool(&value);
    }
    if let Ok(value) = env::var("REPLICA_ID") {
        config.leadership.replica_id = value;
    }

    // Logging
    if let Ok(value) = env::var("MCP_MESH_LOG_LEVEL") {
        config.logging.level = value.to_lowercase();
    }
    if let Ok(value) = env::var("MCP_MESH_DEBUG_MODE") {
        if parse_bool(&value) {
            config.logging.level = "debug".to_string();
        }
    }
    if let Ok(value) = env::var("MCP_MESH_LOG_FILE") {
        config.logging.file_path = Some(PathBuf::from(value));
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"host": "127.0.0.1", "port": "9000"}`)
pub fn apply_cli_overrides(config: &mut MeshRegistryConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("host") {
        config.server.host = value.clone();
    }
    if let Some(value) = cli_args.get("port") {
        if let Ok(port) = value.parse::<u16>() {
            config.server.port = port;
        }
    }
    if let Some(value) = cli_args.get("store_backend") {
        if let Ok(backend) = value.parse::<StoreBackend>() {
            config.store.backend = backend;
        }
    }
    if let Some(value) = cli_args.get("database_url") {
        config.store.database_url = value.clone();
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.to_lowercase();
    }
    if let Some(value) = cli_args.get("debug") {
        if parse_bool(value) {
            config.logging.level = "debug".to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const OVERRIDE_VARS: &[&str] = &[
        "HOST",
        "PORT",
        "DEFAULT_TIMEOUT_THRESHOLD",
        "DEFAULT_EVICTION_THRESHOLD",
        "DATABASE_URL",
        "STORE_BACKEND",
        "MCP_MESH_LOG_LEVEL",
        "MCP_MESH_DEBUG_MODE",
    ];

    fn clear_override_vars() -> Vec<(&'static str, String)> {
        let saved = OVERRIDE_VARS
            .iter()
            .filter_map(|name| env::var(name).ok().map(|value| (*name, value)))
            .collect();
        for name in OVERRIDE_VARS {
            env::remove_var(name);
        }
        saved
    }

    fn restore_vars(saved: Vec<(&'static str, String)>) {
        for name in OVERRIDE_VARS {
            env::remove_var(name);
        }
        for (name, value) in saved {
            env::set_var(name, value);
        }
    }

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_registry.toml");
        File::create(&config_path).unwrap();

        env::set_var("MESH_REGISTRY_CONFIG", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("MESH_REGISTRY_CONFIG");

        assert_eq!(result.unwrap(), Some(config_path));
    }

    #[test]
    fn test_find_config_file_env_var_missing_file() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::set_var("MESH_REGISTRY_CONFIG", "/definitely/not/here.toml");
        let result = find_config_file();
        env::remove_var("MESH_REGISTRY_CONFIG");

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let saved = clear_override_vars();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[server]").unwrap();
        writeln!(file, "port = 9000").unwrap();
        writeln!(file, "[health]").unwrap();
        writeln!(file, "eviction_threshold_secs = 300").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();
        restore_vars(saved);

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.health.eviction_threshold_secs, 300);
        assert_eq!(config.health.timeout_threshold_secs, 60);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = load_config(Some(Path::new("/no/such/mesh_registry.toml")), None);
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "[server\nport = ").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let saved = clear_override_vars();
        let mut config = MeshRegistryConfig::default();

        env::set_var("HOST", "192.168.1.100");
        env::set_var("PORT", "9999");
        env::set_var("DEFAULT_TIMEOUT_THRESHOLD", "15");
        env::set_var("STORE_BACKEND", "sqlite");
        env::set_var("DATABASE_URL", "/tmp/registry.db");

        apply_environment_overrides(&mut config);
        restore_vars(saved);

        assert_eq!(config.server.host, "192.168.1.100");
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.health.timeout_threshold_secs, 15);
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.database_url, "/tmp/registry.db");
    }

    #[test]
    fn test_debug_mode_forces_debug_level() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let saved = clear_override_vars();
        let mut config = MeshRegistryConfig::default();

        env::set_var("MCP_MESH_LOG_LEVEL", "WARN");
        env::set_var("MCP_MESH_DEBUG_MODE", "true");

        apply_environment_overrides(&mut config);
        restore_vars(saved);

        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_unparseable_env_values_are_ignored() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let saved = clear_override_vars();
        let mut config = MeshRegistryConfig::default();

        env::set_var("PORT", "not-a-port");

        apply_environment_overrides(&mut config);
        restore_vars(saved);

        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = MeshRegistryConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("host".to_string(), "10.0.0.1".to_string());
        cli_args.insert("port".to_string(), "7777".to_string());
        cli_args.insert("store_backend".to_string(), "sqlite".to_string());

        apply_cli_overrides(&mut config, &cli_args);

        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 7777);
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let saved = clear_override_vars();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[server]").unwrap();
        writeln!(file, "host = \"file-host\"").unwrap();
        writeln!(file, "port = 8000").unwrap();

        env::set_var("HOST", "env-host");
        env::set_var("PORT", "9000");

        let mut cli_args = HashMap::new();
        cli_args.insert("host".to_string(), "cli-host".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();
        restore_vars(saved);

        // CLI wins for host, env wins for port (no CLI override)
        assert_eq!(config.server.host, "cli-host");
        assert_eq!(config.server.port, 9000);
    }
}
