// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

//! Agent registry core for the mesh coordination registry
//!
//! This crate holds the domain logic without any HTTP coupling:
//! - `types`: agent records, capability declarations, dependency specs, tag expressions
//! - `health`: heartbeat-driven health state machine
//! - `index` / `resolver`: capability index and the pure scoring resolver
//! - `store`: the `AgentStore` contract with memory and SQLite backends
//! - `locks`: per-agent mutation serialization
//! - `leadership`: lease-based single-writer coordination

pub mod health;
pub mod index;
pub mod leadership;
pub mod locks;
pub mod matching;
pub mod resolver;
pub mod store;
pub mod types;

pub use health::{heartbeat_state, HealthPolicy, HealthThresholds, SweepAction};
pub use index::CapabilityIndex;
pub use leadership::{LeadershipCoordinator, LeaseProvider, MemoryLeaseProvider};
#[cfg(feature = "sqlite")]
pub use leadership::SqliteLeaseProvider;
pub use locks::KeyedLocks;
pub use resolver::{changed_since, Candidate, KnownResolution, ResolutionResult, ResolvedProvider};
pub use store::{AgentStore, MemoryAgentStore, TimeoutStore};
#[cfg(feature = "sqlite")]
pub use store::SqliteAgentStore;
pub use types::{AgentRecord, CapabilityDeclaration, DependencySpec, HealthState, TagExpr};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Invalid agent record: {0}")]
    InvalidRecord(String),

    #[error("Store call timed out after {0:?}")]
    StoreTimeout(std::time::Duration),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lease error: {0}")]
    Lease(String),

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RegistryError {
    /// Whether the failure came from the persistence layer
    pub fn is_store_failure(&self) -> bool {
        match self {
            RegistryError::StoreTimeout(_) | RegistryError::StoreUnavailable(_) => true,
            #[cfg(feature = "sqlite")]
            RegistryError::Database(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
