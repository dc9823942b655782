// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Mesh Registry
//!
//! Coordination registry for a mesh of distributed agents: agents register
//! the capabilities they offer and the dependencies they need, report
//! liveness through heartbeats and receive resolved providers in return.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Transport: mesh-api                                    │
//! │  (axum routes, wire DTOs, request deadline)             │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Services: mesh-services                                │
//! │  (register, heartbeat, list, deregister, health sweep)  │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Domain: mesh-agent-registry                            │
//! │  (records, capability index, resolver, store, leases)   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! `mesh-config` and `mesh-observability` sit beside the stack and are
//! used by the `mesh-registry` binary.

pub use mesh_agent_registry as registry;
pub use mesh_api as api;
pub use mesh_config as config;
pub use mesh_observability as observability;
pub use mesh_services as services;

/// Commonly used types
pub mod prelude {
    pub use crate::api::{create_http_server, ApiState};
    pub use crate::registry::{
        AgentRecord, AgentStore, CapabilityDeclaration, DependencySpec, HealthPolicy, HealthState,
        LeadershipCoordinator, MemoryAgentStore,
    };
    pub use crate::services::{
        AgentFilter, AgentMetadata, HealthSweeper, RegisterParams, RegistryService,
        RegistryServiceImpl,
    };
}
