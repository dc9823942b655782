// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

/*!
# Mesh Registry Service Layer

The stable application boundary of the registry: transport-agnostic
operations that any adapter (REST today) calls.

## Architecture

```text
┌─────────────────────────────────────────────────────────────────┐
│                    TRANSPORT ADAPTERS                           │
│  axum REST (mesh-api)                                           │
└────────────────────────────┬────────────────────────────────────┘
                             ↓
┌─────────────────────────────────────────────────────────────────┐
│              SERVICE LAYER (This Crate)                         │
│  • RegistryService - register / heartbeat / list / deregister   │
│  • HealthSweeper   - timer-driven demotion and eviction         │
└────────────────────────────┬────────────────────────────────────┘
                             ↓
┌─────────────────────────────────────────────────────────────────┐
│                   DOMAIN LAYER (mesh-agent-registry)            │
│  AgentStore, CapabilityIndex, resolver, LeadershipCoordinator   │
└─────────────────────────────────────────────────────────────────┘
```

## Usage

```rust,ignore
use mesh_services::{RegistryService, RegistryServiceImpl, RegisterParams};

let service = RegistryServiceImpl::new(store, HealthPolicy::default(), leadership);
let outcome = service.register(params).await?;
for resolution in outcome.resolutions {
    // hand the provider endpoint back to the agent
}
```

Resolution failures are not errors: an unresolved dependency comes back
as a `ResolutionResult` with no provider.
*/

pub mod impls;
pub mod sweeper;
pub mod traits;
pub mod types;
pub mod validation;

// Re-export main API
pub use traits::RegistryService;

pub use types::{
    AgentFilter, AgentMetadata, AgentSnapshot, HeartbeatCheck, HeartbeatOutcome, HeartbeatParams,
    RegisterOutcome, RegisterParams, RegistryStats, ServiceError, ServiceResult, SweepReport,
};

pub use impls::{RegistryServiceImpl, DEFAULT_SWEEP_BATCH_SIZE};
pub use sweeper::{startup_cleanup, HealthSweeper};
