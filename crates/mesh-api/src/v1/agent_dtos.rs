// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

//! Agent API DTOs
//!
//! Field names are part of the contract with the agent runtimes and must
//! not change.

use mesh_agent_registry::{
    CapabilityDeclaration, DependencySpec, KnownResolution, ResolutionResult, TagExpr,
};
use mesh_services::{AgentMetadata, AgentSnapshot};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::common::ApiError;

// ============================================================================
// SHARED
// ============================================================================

/// A capability offered by an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CapabilityDto {
    /// Capability name, e.g. "weather_forecast"
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A capability an agent needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DependencyDto {
    pub capability: String,
    /// Tag expressions: `+tag` (or `tag`) required, `-tag` excluded, `a|b` preferred
    #[serde(default)]
    pub tags: Vec<String>,
    /// Version constraint, e.g. ">=1.2.0" or "^2"
    #[serde(default, alias = "version")]
    pub version_constraint: String,
}

impl From<&CapabilityDeclaration> for CapabilityDto {
    fn from(capability: &CapabilityDeclaration) -> Self {
        Self {
            name: capability.name.clone(),
            tags: capability.tags.iter().cloned().collect(),
            version: capability.version.clone(),
            description: capability.description.clone(),
        }
    }
}

impl From<CapabilityDto> for CapabilityDeclaration {
    fn from(dto: CapabilityDto) -> Self {
        CapabilityDeclaration {
            name: dto.name,
            tags: dto.tags.into_iter().collect(),
            version: dto.version,
            description: dto.description,
        }
    }
}

impl From<&DependencySpec> for DependencyDto {
    fn from(spec: &DependencySpec) -> Self {
        Self {
            capability: spec.capability.clone(),
            tags: spec.tags.iter().map(|t| t.to_string()).collect(),
            version_constraint: spec.version_constraint.clone(),
        }
    }
}

impl TryFrom<DependencyDto> for DependencySpec {
    type Error = ApiError;

    fn try_from(dto: DependencyDto) -> Result<Self, Self::Error> {
        let tags = dto
            .tags
            .iter()
            .map(|raw| {
                raw.parse::<TagExpr>().map_err(|_| {
                    ApiError::invalid_request(format!(
                        "dependencies: invalid tag expression '{}' for '{}'",
                        raw, dto.capability
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DependencySpec::new(dto.capability)
            .with_tags(tags)
            .with_version_constraint(dto.version_constraint))
    }
}

/// Declared agent metadata
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgentMetadataDto {
    /// Defaults to the agent id
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// `http(s)://host:port` or `stdio://name`; defaults to `stdio://<agent_id>`
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Required, may be empty
    pub capabilities: Vec<CapabilityDto>,
    /// Required, may be empty
    pub dependencies: Vec<DependencyDto>,
    /// Seconds of silence before the agent is considered degraded
    #[serde(default)]
    pub timeout_threshold: Option<u64>,
    /// Seconds of silence before the agent is considered unhealthy
    #[serde(default)]
    pub eviction_threshold: Option<u64>,
}

impl TryFrom<AgentMetadataDto> for AgentMetadata {
    type Error = ApiError;

    fn try_from(dto: AgentMetadataDto) -> Result<Self, Self::Error> {
        Ok(AgentMetadata {
            name: dto.name.unwrap_or_default(),
            version: dto.version.unwrap_or_default(),
            endpoint: dto.endpoint.unwrap_or_default(),
            capabilities: dto.capabilities.into_iter().map(Into::into).collect(),
            dependencies: dto
                .dependencies
                .into_iter()
                .map(DependencySpec::try_from)
                .collect::<Result<Vec<_>, _>>()?,
            timeout_threshold: dto.timeout_threshold,
            eviction_threshold: dto.eviction_threshold,
        })
    }
}

/// Resolution of one declared dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResolvedDependencyDto {
    /// Position in the agent's `dependencies` list
    pub dep_index: usize,
    pub capability: String,
    /// `false` means no provider is currently available
    pub resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl From<ResolutionResult> for ResolvedDependencyDto {
    fn from(result: ResolutionResult) -> Self {
        let resolved = result.is_resolved();
        let (agent_id, endpoint, tags, version) = match result.provider {
            Some(p) => (Some(p.agent_id), Some(p.endpoint), Some(p.tags), Some(p.version)),
            None => (None, None, None, None),
        };
        Self {
            dep_index: result.dep_index,
            capability: result.capability,
            resolved,
            agent_id,
            endpoint,
            tags,
            version,
        }
    }
}

pub fn resolutions_to_dtos(results: Vec<ResolutionResult>) -> Vec<ResolvedDependencyDto> {
    results.into_iter().map(Into::into).collect()
}

// ============================================================================
// REGISTER
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterAgentRequest {
    pub agent_id: String,
    pub metadata: AgentMetadataDto,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterAgentResponse {
    /// Always "success"
    pub status: String,
    pub agent_id: String,
    pub timestamp: String,
    /// Every declared dependency, unresolved ones included; omitted when none are declared
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies_resolved: Vec<ResolvedDependencyDto>,
}

// ============================================================================
// HEARTBEAT
// ============================================================================

/// What the agent currently holds for one dependency
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KnownResolutionDto {
    pub dep_index: usize,
    /// Omit when the agent holds no provider
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl From<KnownResolutionDto> for KnownResolution {
    fn from(dto: KnownResolutionDto) -> Self {
        KnownResolution {
            dep_index: dto.dep_index,
            agent_id: dto.agent_id,
            endpoint: dto.endpoint,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HeartbeatRequest {
    pub agent_id: String,
    /// "healthy", "degraded" or "unhealthy"
    #[serde(default)]
    pub status: Option<String>,
    /// Replaces the declared metadata when present
    #[serde(default)]
    pub metadata: Option<AgentMetadataDto>,
    /// Omit to receive every resolution
    #[serde(default)]
    pub known_resolutions: Option<Vec<KnownResolutionDto>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HeartbeatResponse {
    /// Always "success"
    pub status: String,
    pub timestamp: String,
    /// Only resolutions that differ from `known_resolutions`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies_resolved: Vec<ResolvedDependencyDto>,
}

// ============================================================================
// LISTING
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AgentListQuery {
    /// Only agents offering this capability
    pub capability: Option<String>,
    /// Case-insensitive substring match on `capability`
    #[serde(default)]
    pub fuzzy: bool,
    /// Only agents in this health state
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgentSummary {
    pub id: String,
    pub name: String,
    /// healthy, degraded or unhealthy
    pub status: String,
    pub endpoint: String,
    pub capabilities: Vec<CapabilityDto>,
    pub dependencies: Vec<DependencyDto>,
    /// Last heartbeat, RFC 3339
    pub last_seen: String,
    pub version: String,
}

impl From<&AgentSnapshot> for AgentSummary {
    fn from(snapshot: &AgentSnapshot) -> Self {
        let record = &snapshot.record;
        Self {
            id: record.agent_id.clone(),
            name: record.name.clone(),
            status: snapshot.health.to_string(),
            endpoint: record.endpoint.clone(),
            capabilities: record.capabilities.iter().map(Into::into).collect(),
            dependencies: record.dependencies.iter().map(Into::into).collect(),
            last_seen: record.last_heartbeat_at.to_rfc3339(),
            version: record.version.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgentListResponse {
    pub agents: Vec<AgentSummary>,
    pub count: usize,
    pub timestamp: String,
}

/// Full record of one agent
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgentDetail {
    pub id: String,
    pub name: String,
    pub status: String,
    /// Health as stored, before timing is taken into account
    pub stored_status: String,
    pub endpoint: String,
    pub version: String,
    pub capabilities: Vec<CapabilityDto>,
    pub dependencies: Vec<DependencyDto>,
    pub last_seen: String,
    pub registered_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_threshold: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eviction_threshold: Option<u64>,
}

impl From<AgentSnapshot> for AgentDetail {
    fn from(snapshot: AgentSnapshot) -> Self {
        let record = snapshot.record;
        Self {
            capabilities: record.capabilities.iter().map(Into::into).collect(),
            dependencies: record.dependencies.iter().map(Into::into).collect(),
            status: snapshot.health.to_string(),
            stored_status: record.health.to_string(),
            last_seen: record.last_heartbeat_at.to_rfc3339(),
            registered_at: record.registered_at.to_rfc3339(),
            timeout_threshold: record.timeout_threshold_secs,
            eviction_threshold: record.eviction_threshold_secs,
            id: record.agent_id,
            name: record.name,
            endpoint: record.endpoint,
            version: record.version,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeregisterResponse {
    /// Always "success", also when the agent was not registered
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_agent_registry::ResolvedProvider;

    #[test]
    fn test_unresolved_entry_has_no_provider_fields() {
        let dto = ResolvedDependencyDto::from(ResolutionResult {
            dep_index: 1,
            capability: "weather".into(),
            provider: None,
        });
        let body = serde_json::to_value(dto).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"dep_index": 1, "capability": "weather", "resolved": false})
        );
    }

    #[test]
    fn test_resolved_entry_carries_provider() {
        let dto = ResolvedDependencyDto::from(ResolutionResult {
            dep_index: 0,
            capability: "date".into(),
            provider: Some(ResolvedProvider {
                agent_id: "p1".into(),
                endpoint: "http://p1:9000".into(),
                capability: "date".into(),
                tags: vec!["system".into()],
                version: "1.0.0".into(),
            }),
        });
        assert!(dto.resolved);
        assert_eq!(dto.agent_id.as_deref(), Some("p1"));
        assert_eq!(dto.tags, Some(vec!["system".to_string()]));
    }

    #[test]
    fn test_bad_tag_expression_is_invalid_request() {
        let dto = DependencyDto {
            capability: "llm".into(),
            tags: vec!["+".into()],
            version_constraint: String::new(),
        };
        let err = DependencySpec::try_from(dto).unwrap_err();
        assert_eq!(err.code, crate::common::ApiErrorCode::InvalidRequest);
    }

    #[test]
    fn test_metadata_lists_are_required() {
        let parsed: Result<AgentMetadataDto, _> =
            serde_json::from_value(serde_json::json!({"name": "a", "capabilities": []}));
        assert!(parsed.is_err());
    }
}
