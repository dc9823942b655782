/*!
Transport-agnostic Data Transfer Objects (DTOs).

These types define the stable contract between adapters and the registry
service. Adapters translate their wire format into these and back.
*/

use chrono::{DateTime, Utc};
use mesh_agent_registry::{
    AgentRecord, CapabilityDeclaration, DependencySpec, HealthState, KnownResolution,
    ResolutionResult,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// REGISTRATION DTOs
// ============================================================================

/// Metadata an agent declares about itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMetadata {
    /// Defaults to the agent id when empty
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    /// Defaults to `stdio://<agent_id>` when empty
    #[serde(default)]
    pub endpoint: String,
    pub capabilities: Vec<CapabilityDeclaration>,
    pub dependencies: Vec<DependencySpec>,
    /// Per-agent degrade threshold in seconds
    #[serde(default)]
    pub timeout_threshold: Option<u64>,
    /// Per-agent eviction threshold in seconds
    #[serde(default)]
    pub eviction_threshold: Option<u64>,
}

impl AgentMetadata {
    /// Copy the declared fields onto a record, leaving identity and timing alone
    pub fn apply_to(&self, record: &mut AgentRecord) {
        record.name = self.name.clone();
        record.version = self.version.clone();
        record.endpoint = self.endpoint.clone();
        record.capabilities = self.capabilities.clone();
        record.dependencies = self.dependencies.clone();
        record.timeout_threshold_secs = self.timeout_threshold;
        record.eviction_threshold_secs = self.eviction_threshold;
    }
}

/// Parameters for registering (or re-registering) an agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterParams {
    pub agent_id: String,
    pub metadata: AgentMetadata,
}

/// Result of a successful registration
#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
    /// One entry per declared dependency, unresolved ones included
    pub resolutions: Vec<ResolutionResult>,
}

// ============================================================================
// HEARTBEAT DTOs
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct HeartbeatParams {
    pub agent_id: String,
    /// Self-reported status: `healthy`, `degraded` or `unhealthy`
    pub status: Option<String>,
    /// Replaces the declared metadata when present
    pub metadata: Option<AgentMetadata>,
    /// What the agent currently believes; `None` asks for the full set
    pub known_resolutions: Option<Vec<KnownResolution>>,
}

#[derive(Debug, Clone)]
pub struct HeartbeatOutcome {
    pub timestamp: DateTime<Utc>,
    pub health: HealthState,
    /// Only the resolutions that differ from `known_resolutions`
    pub resolutions: Vec<ResolutionResult>,
}

/// Answer to the body-less heartbeat probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatCheck {
    /// Nothing that could change a resolution happened since the agent's last full heartbeat
    Unchanged,
    /// The agent should send a full heartbeat
    TopologyChanged,
}

// ============================================================================
// QUERY DTOs
// ============================================================================

/// Filter for agent listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentFilter {
    pub capability: Option<String>,
    /// Case-insensitive substring match on capability names
    pub fuzzy: bool,
    pub status: Option<HealthState>,
}

impl AgentFilter {
    pub fn matches(&self, snapshot: &AgentSnapshot) -> bool {
        if let Some(status) = self.status {
            if snapshot.health != status {
                return false;
            }
        }
        match &self.capability {
            None => true,
            Some(wanted) if self.fuzzy => {
                let wanted = wanted.to_lowercase();
                snapshot
                    .record
                    .capabilities
                    .iter()
                    .any(|c| c.name.to_lowercase().contains(&wanted))
            }
            Some(wanted) => snapshot.record.capabilities.iter().any(|c| &c.name == wanted),
        }
    }
}

/// A stored record together with its health as of the query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSnapshot {
    pub record: AgentRecord,
    pub health: HealthState,
}

/// Registry-wide counters for the root endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub agent_count: usize,
    pub topology_revision: u64,
    pub is_leader: bool,
}

// ============================================================================
// SWEEP DTOs
// ============================================================================

/// What one health sweep pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub demoted: usize,
    pub evicted: usize,
    /// Records that changed under the sweep and were left alone
    pub skipped: usize,
    pub failed: usize,
}

impl SweepReport {
    pub fn changed_anything(&self) -> bool {
        self.demoted > 0 || self.evicted > 0
    }
}
