// OpenAPI documentation generation
//
// Generated at compile time with utoipa from the handler annotations.

use utoipa::OpenApi;

use crate::common::{ApiError, ApiErrorCode};
use crate::v1::{
    AgentDetail, AgentListResponse, AgentMetadataDto, AgentSummary, CapabilityDto,
    DependencyDto, DeregisterResponse, HealthResponse, HeartbeatRequest, HeartbeatResponse,
    KnownResolutionDto, RegisterAgentRequest, RegisterAgentResponse, ResolvedDependencyDto,
    RootResponse,
};

/// OpenAPI documentation for the mesh registry REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Mesh Registry API",
        description = "Agent registration, heartbeat and dependency resolution for the MCP mesh",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local registry")
    ),
    paths(
        crate::endpoints::health::root_info,
        crate::endpoints::health::health_check,
        crate::endpoints::health::health_head,
        crate::endpoints::agents::register_agent,
        crate::endpoints::agents::list_agents,
        crate::endpoints::agents::get_agent,
        crate::endpoints::agents::deregister_agent,
        crate::endpoints::heartbeat::heartbeat,
        crate::endpoints::heartbeat::heartbeat_check,
    ),
    components(
        schemas(
            ApiError,
            ApiErrorCode,
            CapabilityDto,
            DependencyDto,
            AgentMetadataDto,
            ResolvedDependencyDto,
            RegisterAgentRequest,
            RegisterAgentResponse,
            KnownResolutionDto,
            HeartbeatRequest,
            HeartbeatResponse,
            AgentSummary,
            AgentListResponse,
            AgentDetail,
            DeregisterResponse,
            HealthResponse,
            RootResponse,
        )
    ),
    tags(
        (name = "Agents", description = "Registration, listing and removal of agents"),
        (name = "Heartbeat", description = "Liveness reports and topology-change probes"),
        (name = "Health", description = "Registry process health and service information")
    )
)]
pub struct ApiDoc;
