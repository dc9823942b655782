//! Health and service-info DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: String,
    pub service: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RootResponse {
    pub service: String,
    pub version: String,
    /// Always "running"
    pub status: String,
    pub endpoints: Vec<String>,
    pub agent_count: usize,
    /// Bumped whenever a change could alter some dependency resolution
    pub topology_revision: u64,
    pub is_leader: bool,
}
