// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

//! Registry service trait
//!
//! The operations agents and inspection tools call. Register and Heartbeat
//! are idempotent for the same payload and safe to retry.

use async_trait::async_trait;

use crate::types::{
    AgentFilter, AgentSnapshot, HeartbeatCheck, HeartbeatOutcome, HeartbeatParams,
    RegisterOutcome, RegisterParams, RegistryStats, ServiceResult, SweepReport,
};

#[async_trait]
pub trait RegistryService: Send + Sync {
    /// Create or overwrite an agent record and resolve all its dependencies
    ///
    /// The capability index is updated before this returns, so an agent
    /// registering right after can already resolve against this one.
    async fn register(&self, params: RegisterParams) -> ServiceResult<RegisterOutcome>;

    /// Refresh liveness and return the resolutions that changed
    ///
    /// Fails with `NotRegistered` for unknown agents.
    async fn heartbeat(&self, params: HeartbeatParams) -> ServiceResult<HeartbeatOutcome>;

    /// Cheap probe: has the topology moved since the agent's last full heartbeat?
    async fn check_heartbeat(&self, agent_id: &str) -> ServiceResult<HeartbeatCheck>;

    /// Read-only snapshot for inspection tooling
    async fn list_agents(&self, filter: AgentFilter) -> ServiceResult<Vec<AgentSnapshot>>;

    async fn get_agent(&self, agent_id: &str) -> ServiceResult<AgentSnapshot>;

    /// Remove an agent; returns `false` when it was not registered
    async fn deregister(&self, agent_id: &str) -> ServiceResult<bool>;

    /// One health sweep pass: at most one demotion step per record
    async fn sweep(&self) -> ServiceResult<SweepReport>;

    fn stats(&self) -> RegistryStats;

    fn is_leader(&self) -> bool;
}
