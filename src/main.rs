// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use mesh_agent_registry::{
    AgentStore, HealthPolicy, LeadershipCoordinator, LeaseProvider, MemoryAgentStore,
    MemoryLeaseProvider, TimeoutStore,
};
use mesh_api::{create_http_server, ApiState};
use mesh_config::{load_config, validate_config, MeshRegistryConfig, StoreBackend};
use mesh_observability::{debug_flags_help, init_logging, parse_debug_flags, LogFormat};
use mesh_services::{startup_cleanup, HealthSweeper, RegistryService, RegistryServiceImpl};

/// Mesh Registry - capability discovery and health tracking for mesh agents
#[derive(Parser, Debug)]
#[command(name = "mesh-registry", version, about, after_help = debug_flags_help())]
struct Args {
    /// Path to mesh_registry.toml (searched for when omitted)
    #[arg(short, long, env = "MESH_REGISTRY_CONFIG")]
    config: Option<PathBuf>,

    /// Bind host
    #[arg(long)]
    host: Option<String>,

    /// Bind port
    #[arg(short, long)]
    port: Option<u16>,

    /// Record store backend (memory, sqlite)
    #[arg(long)]
    store_backend: Option<String>,

    /// SQLite database file or sqlite: URL
    #[arg(long)]
    database_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    debug: bool,
}

impl Args {
    fn overrides(&self) -> HashMap<String, String> {
        let mut cli = HashMap::new();
        if let Some(host) = &self.host {
            cli.insert("host".to_string(), host.clone());
        }
        if let Some(port) = self.port {
            cli.insert("port".to_string(), port.to_string());
        }
        if let Some(backend) = &self.store_backend {
            cli.insert("store_backend".to_string(), backend.clone());
        }
        if let Some(url) = &self.database_url {
            cli.insert("database_url".to_string(), url.clone());
        }
        if let Some(level) = &self.log_level {
            cli.insert("log_level".to_string(), level.clone());
        }
        if self.debug {
            cli.insert("debug".to_string(), "true".to_string());
        }
        cli
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Per-crate `--debug-<crate>` flags are read by mesh-observability
    let args = Args::parse_from(std::env::args().filter(|arg| {
        !(arg.starts_with("--debug-") && arg.len() > "--debug-".len())
    }));

    let config = load_config(args.config.as_deref(), Some(&args.overrides()))
        .context("Failed to load configuration")?;
    validate_config(&config).context("Invalid configuration")?;

    let logging = mesh_observability::LoggingConfig {
        level: config.logging.level.clone(),
        format: LogFormat::from_name(&config.logging.format),
        file_path: config.logging.file_path.clone(),
    };
    let _log_guard = init_logging(&logging, &parse_debug_flags())?;

    info!(
        version = mesh_api::VERSION,
        bind = %config.server.bind_address(),
        backend = ?config.store.backend,
        leadership = config.leadership.enabled,
        "starting mesh registry"
    );

    let (store, lease_provider) = build_store(&config).await?;
    let store: Arc<dyn AgentStore> = Arc::new(TimeoutStore::new(store, config.store.timeout()));

    let leadership = Arc::new(if config.leadership.enabled {
        LeadershipCoordinator::new(
            lease_provider,
            config.leadership.replica_id.clone(),
            config.leadership.lease_ttl(),
        )
    } else {
        LeadershipCoordinator::disabled(config.leadership.replica_id.clone())
    });
    if leadership.is_enabled() && !leadership.tick().await {
        info!(replica = leadership.holder(), "starting as follower");
    }

    let policy = HealthPolicy::new(
        config.health.timeout_threshold(),
        config.health.eviction_threshold(),
        config.health.eviction_grace(),
    );
    let service: Arc<dyn RegistryService> = Arc::new(
        RegistryServiceImpl::new(store, policy, leadership.clone())
            .with_sweep_batch_size(config.health.sweep_batch_size),
    );

    if config.health.startup_cleanup {
        if let Err(e) = startup_cleanup(service.as_ref()).await {
            warn!(error = %e, "startup cleanup failed; the sweeper will retry");
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = vec![
        HealthSweeper::new(service.clone(), config.health.health_check_interval())
            .spawn(shutdown_rx.clone()),
    ];
    if leadership.is_enabled() {
        tasks.push(leadership.clone().spawn(shutdown_rx));
    }

    let state = ApiState::new(service, config.server.service_name.clone())
        .with_request_timeout(config.server.request_timeout());
    let app = create_http_server(state);

    let bind_address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!(address = %bind_address, "registry listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("shutting down background tasks");
    let _ = shutdown_tx.send(true);
    for task in tasks {
        if let Err(e) = task.await {
            warn!(error = %e, "background task ended abnormally");
        }
    }
    info!("mesh registry stopped");
    Ok(())
}

/// Open the configured record store and the lease provider that goes with it
async fn build_store(
    config: &MeshRegistryConfig,
) -> Result<(Arc<dyn AgentStore>, Arc<dyn LeaseProvider>)> {
    match config.store.backend {
        StoreBackend::Memory => {
            if config.leadership.enabled {
                warn!("leadership with the memory backend only coordinates within this process");
            }
            Ok((
                Arc::new(MemoryAgentStore::new()),
                Arc::new(MemoryLeaseProvider::new()),
            ))
        }
        #[cfg(feature = "sqlite")]
        StoreBackend::Sqlite => {
            let store = mesh_agent_registry::SqliteAgentStore::connect(&config.store.database_url)
                .await
                .with_context(|| format!("Failed to open {}", config.store.database_url))?;
            let leases = mesh_agent_registry::SqliteLeaseProvider::new(store.pool().clone());
            info!(database = %config.store.database_url, "sqlite store ready");
            Ok((Arc::new(store), Arc::new(leases)))
        }
        #[cfg(not(feature = "sqlite"))]
        StoreBackend::Sqlite => anyhow::bail!("built without the sqlite feature"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
