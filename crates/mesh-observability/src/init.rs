// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console output always; an optional JSON file layer with daily rotation.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingConfig};

/// Keeps the non-blocking file writer alive; logs are flushed on drop
pub struct LoggingGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
    log_file: Option<PathBuf>,
}

impl LoggingGuard {
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

/// Build the filter used by every layer
///
/// `RUST_LOG` wins when set; otherwise the configured level plus any
/// per-crate debug flags.
pub fn build_env_filter(config: &LoggingConfig, debug_flags: &CrateDebugFlags) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::new(debug_flags.to_filter_string(&config.level))
}

/// Initialize the global tracing subscriber
///
/// # Errors
///
/// Fails if the log file directory cannot be created or a global subscriber
/// is already installed.
pub fn init_logging(config: &LoggingConfig, debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    let mut layers = Vec::new();

    let console_layer = match config.format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(build_env_filter(config, debug_flags))
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(build_env_filter(config, debug_flags))
            .boxed(),
    };
    layers.push(console_layer);

    let mut file_guard = None;
    if let Some(file_path) = &config.file_path {
        let directory = file_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mesh-registry.log".to_string());

        std::fs::create_dir_all(directory)
            .with_context(|| format!("Failed to create log directory: {}", directory.display()))?;

        let (non_blocking, guard) = tracing_appender::non_blocking(rolling::daily(directory, file_name));
        file_guard = Some(guard);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .with_filter(build_env_filter(config, debug_flags))
            .boxed();
        layers.push(file_layer);
    }

    Registry::default()
        .with(layers)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
        log_file: config.file_path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_uses_configured_level() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            level: "warn".to_string(),
            ..LoggingConfig::default()
        };
        let flags = CrateDebugFlags::from_args(vec!["--debug-mesh-api".to_string()]);
        let filter = build_env_filter(&config, &flags).to_string();
        assert!(filter.contains("mesh_api=debug"));
        assert!(filter.contains("warn"));
    }
}
