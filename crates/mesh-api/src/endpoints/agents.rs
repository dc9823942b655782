// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

// Agent registration and inspection endpoints

use axum::http::StatusCode;
use chrono::Utc;
use mesh_agent_registry::HealthState;
use mesh_services::{AgentFilter, AgentMetadata, RegisterParams};

use crate::common::{ApiError, ApiJson, ApiPath, ApiQuery, ApiResult, ApiState, Json, State};
use crate::v1::{
    resolutions_to_dtos, AgentDetail, AgentListQuery, AgentListResponse, AgentSummary,
    DeregisterResponse, RegisterAgentRequest, RegisterAgentResponse,
};

/// Register (or re-register) an agent and resolve its dependencies
#[utoipa::path(
    post,
    path = "/agents/register",
    request_body = RegisterAgentRequest,
    responses(
        (status = 201, description = "Agent registered", body = RegisterAgentResponse),
        (status = 400, description = "Missing or invalid agent_id or metadata", body = ApiError),
        (status = 503, description = "Store unavailable or not the leader", body = ApiError)
    ),
    tag = "Agents"
)]
pub async fn register_agent(
    State(state): State<ApiState>,
    ApiJson(request): ApiJson<RegisterAgentRequest>,
) -> ApiResult<(StatusCode, Json<RegisterAgentResponse>)> {
    let metadata = AgentMetadata::try_from(request.metadata)?;
    let outcome = state
        .registry_service
        .register(RegisterParams {
            agent_id: request.agent_id,
            metadata,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterAgentResponse {
            status: "success".to_string(),
            agent_id: outcome.agent_id,
            timestamp: outcome.timestamp.to_rfc3339(),
            dependencies_resolved: resolutions_to_dtos(outcome.resolutions),
        }),
    ))
}

/// List registered agents, optionally filtered
#[utoipa::path(
    get,
    path = "/agents",
    params(AgentListQuery),
    responses(
        (status = 200, description = "Agent snapshot", body = AgentListResponse),
        (status = 400, description = "Unknown status filter", body = ApiError),
        (status = 503, description = "Store unavailable", body = ApiError)
    ),
    tag = "Agents"
)]
pub async fn list_agents(
    State(state): State<ApiState>,
    ApiQuery(query): ApiQuery<AgentListQuery>,
) -> ApiResult<Json<AgentListResponse>> {
    let status = query
        .status
        .as_deref()
        .map(|raw| {
            raw.parse::<HealthState>()
                .map_err(|_| ApiError::invalid_request(format!("unknown status filter '{}'", raw)))
        })
        .transpose()?;

    let snapshots = state
        .registry_service
        .list_agents(AgentFilter {
            capability: query.capability,
            fuzzy: query.fuzzy,
            status,
        })
        .await?;

    let agents: Vec<AgentSummary> = snapshots.iter().map(AgentSummary::from).collect();
    Ok(Json(AgentListResponse {
        count: agents.len(),
        agents,
        timestamp: Utc::now().to_rfc3339(),
    }))
}

/// Full record of one agent
#[utoipa::path(
    get,
    path = "/agents/{agent_id}",
    params(("agent_id" = String, Path, description = "Agent identifier")),
    responses(
        (status = 200, description = "Agent record", body = AgentDetail),
        (status = 404, description = "Agent not registered", body = ApiError)
    ),
    tag = "Agents"
)]
pub async fn get_agent(
    State(state): State<ApiState>,
    ApiPath(agent_id): ApiPath<String>,
) -> ApiResult<Json<AgentDetail>> {
    let snapshot = state.registry_service.get_agent(&agent_id).await?;
    Ok(Json(AgentDetail::from(snapshot)))
}

/// Remove an agent; unknown ids succeed as well
#[utoipa::path(
    delete,
    path = "/agents/{agent_id}",
    params(("agent_id" = String, Path, description = "Agent identifier")),
    responses(
        (status = 200, description = "Agent removed (or was not registered)", body = DeregisterResponse),
        (status = 503, description = "Store unavailable or not the leader", body = ApiError)
    ),
    tag = "Agents"
)]
pub async fn deregister_agent(
    State(state): State<ApiState>,
    ApiPath(agent_id): ApiPath<String>,
) -> ApiResult<Json<DeregisterResponse>> {
    state.registry_service.deregister(&agent_id).await?;
    Ok(Json(DeregisterResponse {
        status: "success".to_string(),
    }))
}
