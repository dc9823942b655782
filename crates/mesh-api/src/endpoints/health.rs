// Health and service-info endpoints

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use chrono::Utc;

use crate::common::{ApiState, Json, State};
use crate::v1::{HealthResponse, RootResponse};
use crate::VERSION;

const ENDPOINTS: &[&str] = &[
    "GET /",
    "GET /health",
    "HEAD /health",
    "POST /agents/register",
    "GET /agents",
    "GET /agents/{agent_id}",
    "DELETE /agents/{agent_id}",
    "POST /heartbeat",
    "HEAD /heartbeat/{agent_id}",
    "GET /api-docs/openapi.json",
];

/// Liveness of the registry process itself
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Registry is serving", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
        uptime_seconds: state.uptime().as_secs(),
        timestamp: Utc::now().to_rfc3339(),
        service: state.service_name.clone(),
    })
}

/// Same information as `GET /health`, carried in headers
#[utoipa::path(
    head,
    path = "/health",
    responses(
        (status = 200, description = "Registry is serving; see X-Health-Status, X-Service-Version, X-Uptime-Seconds")
    ),
    tag = "Health"
)]
pub async fn health_head(State(state): State<ApiState>) -> (StatusCode, HeaderMap) {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("x-health-status"),
        HeaderValue::from_static("healthy"),
    );
    headers.insert(
        HeaderName::from_static("x-service-version"),
        HeaderValue::from_static(VERSION),
    );
    headers.insert(
        HeaderName::from_static("x-uptime-seconds"),
        HeaderValue::from(state.uptime().as_secs()),
    );
    (StatusCode::OK, headers)
}

/// Service description and registry counters
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = RootResponse)
    ),
    tag = "Health"
)]
pub async fn root_info(State(state): State<ApiState>) -> Json<RootResponse> {
    let stats = state.registry_service.stats();
    Json(RootResponse {
        service: state.service_name.clone(),
        version: VERSION.to_string(),
        status: "running".to_string(),
        endpoints: ENDPOINTS.iter().map(|e| e.to_string()).collect(),
        agent_count: stats.agent_count,
        topology_revision: stats.topology_revision,
        is_leader: stats.is_leader,
    })
}
