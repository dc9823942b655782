// Heartbeat endpoints

use axum::http::StatusCode;
use mesh_services::{AgentMetadata, HeartbeatCheck, HeartbeatParams, ServiceError};
use tracing::warn;

use crate::common::{ApiError, ApiJson, ApiPath, ApiResult, ApiState, Json, State};
use crate::v1::{resolutions_to_dtos, HeartbeatRequest, HeartbeatResponse};

/// Refresh liveness and pick up changed dependency resolutions
#[utoipa::path(
    post,
    path = "/heartbeat",
    request_body = HeartbeatRequest,
    responses(
        (status = 200, description = "Heartbeat recorded", body = HeartbeatResponse),
        (status = 400, description = "Malformed body or unknown status", body = ApiError),
        (status = 404, description = "Agent not registered; re-register", body = ApiError),
        (status = 503, description = "Store unavailable or not the leader", body = ApiError)
    ),
    tag = "Heartbeat"
)]
pub async fn heartbeat(
    State(state): State<ApiState>,
    ApiJson(request): ApiJson<HeartbeatRequest>,
) -> ApiResult<Json<HeartbeatResponse>> {
    let metadata = request.metadata.map(AgentMetadata::try_from).transpose()?;
    let outcome = state
        .registry_service
        .heartbeat(HeartbeatParams {
            agent_id: request.agent_id,
            status: request.status,
            metadata,
            known_resolutions: request
                .known_resolutions
                .map(|known| known.into_iter().map(Into::into).collect()),
        })
        .await?;

    Ok(Json(HeartbeatResponse {
        status: "success".to_string(),
        timestamp: outcome.timestamp.to_rfc3339(),
        dependencies_resolved: resolutions_to_dtos(outcome.resolutions),
    }))
}

/// Body-less probe: should the agent send a full heartbeat?
///
/// 200 nothing changed, 202 topology changed, 410 unknown agent, 503 store error.
#[utoipa::path(
    head,
    path = "/heartbeat/{agent_id}",
    params(("agent_id" = String, Path, description = "Agent identifier")),
    responses(
        (status = 200, description = "Nothing changed since the last full heartbeat"),
        (status = 202, description = "Topology changed; send a full heartbeat"),
        (status = 410, description = "Agent not registered; re-register"),
        (status = 503, description = "Store unavailable")
    ),
    tag = "Heartbeat"
)]
pub async fn heartbeat_check(
    State(state): State<ApiState>,
    ApiPath(agent_id): ApiPath<String>,
) -> StatusCode {
    match state.registry_service.check_heartbeat(&agent_id).await {
        Ok(HeartbeatCheck::Unchanged) => StatusCode::OK,
        Ok(HeartbeatCheck::TopologyChanged) => StatusCode::ACCEPTED,
        Err(ServiceError::NotRegistered(_)) => StatusCode::GONE,
        Err(ServiceError::StoreUnavailable(_)) | Err(ServiceError::Timeout(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        Err(e) => {
            warn!(agent_id = %agent_id, error = %e, "heartbeat probe failed");
            ApiError::from(e).status()
        }
    }
}
