// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

//! # mesh-observability
//!
//! Logging setup shared by the registry binary and its tests.
//!
//! Provides consistent `tracing` initialization across the workspace with
//! per-crate debug flag support (`--debug-mesh-services`, `MESH_DEBUG=all`).

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known workspace crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "mesh-registry",
    "mesh-api",
    "mesh-services",
    "mesh-agent-registry",
    "mesh-config",
];
