//! Request validation
//!
//! Runs before any mutation so a malformed registration never touches the
//! store or the capability index.

use mesh_agent_registry::HealthState;
use url::Url;

use crate::types::{AgentMetadata, ServiceError, ServiceResult};

pub const MAX_AGENT_ID_LEN: usize = 253;
pub const MAX_TIMEOUT_THRESHOLD_SECS: u64 = 7200;
pub const MAX_EVICTION_THRESHOLD_SECS: u64 = 14400;

fn invalid(field: &str, message: impl std::fmt::Display) -> ServiceError {
    ServiceError::InvalidRequest(format!("{}: {}", field, message))
}

pub fn validate_agent_id(agent_id: &str) -> ServiceResult<()> {
    if agent_id.trim().is_empty() {
        return Err(invalid("agent_id", "agent_id is required"));
    }
    if agent_id.len() > MAX_AGENT_ID_LEN {
        return Err(invalid(
            "agent_id",
            format!("agent_id cannot exceed {} characters", MAX_AGENT_ID_LEN),
        ));
    }
    Ok(())
}

/// `http(s)://host[...]` or `stdio://<name>`
pub fn validate_endpoint(endpoint: &str) -> ServiceResult<()> {
    if endpoint.starts_with("stdio://") {
        return Ok(());
    }
    let parsed = Url::parse(endpoint)
        .map_err(|e| invalid("endpoint", format!("endpoint must be a valid URL: {}", e)))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(invalid(
            "endpoint",
            "endpoint must be a valid HTTP/HTTPS URL or stdio:// protocol",
        ));
    }
    if parsed.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(invalid("endpoint", "endpoint must include a valid host"));
    }
    Ok(())
}

fn validate_threshold(field: &str, value: Option<u64>, max: u64) -> ServiceResult<()> {
    match value {
        Some(secs) if secs == 0 || secs > max => Err(invalid(
            field,
            format!("must be between 1 and {} seconds, got {}", max, secs),
        )),
        _ => Ok(()),
    }
}

/// Validate and normalize declared metadata in place
///
/// Fills the name and endpoint defaults.
pub fn normalize_metadata(agent_id: &str, metadata: &mut AgentMetadata) -> ServiceResult<()> {
    if metadata.name.trim().is_empty() {
        metadata.name = agent_id.to_string();
    }
    if metadata.endpoint.trim().is_empty() {
        metadata.endpoint = format!("stdio://{}", agent_id);
    }
    validate_endpoint(&metadata.endpoint)?;

    for (i, capability) in metadata.capabilities.iter().enumerate() {
        if capability.name.trim().is_empty() {
            return Err(invalid(
                &format!("capabilities[{}].name", i),
                "capability name is required",
            ));
        }
    }
    for (i, dependency) in metadata.dependencies.iter().enumerate() {
        if dependency.capability.trim().is_empty() {
            return Err(invalid(
                &format!("dependencies[{}].capability", i),
                "dependency capability is required",
            ));
        }
    }

    validate_threshold("timeout_threshold", metadata.timeout_threshold, MAX_TIMEOUT_THRESHOLD_SECS)?;
    validate_threshold(
        "eviction_threshold",
        metadata.eviction_threshold,
        MAX_EVICTION_THRESHOLD_SECS,
    )?;
    if let (Some(timeout), Some(eviction)) = (metadata.timeout_threshold, metadata.eviction_threshold) {
        if eviction <= timeout {
            return Err(invalid(
                "eviction_threshold",
                "eviction_threshold must be greater than timeout_threshold",
            ));
        }
    }
    Ok(())
}

/// Parse a heartbeat's self-reported status
pub fn parse_reported_status(status: Option<&str>) -> ServiceResult<Option<HealthState>> {
    match status.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => match raw.to_lowercase().as_str() {
            "healthy" => Ok(Some(HealthState::Healthy)),
            "degraded" => Ok(Some(HealthState::Degraded)),
            "unhealthy" => Ok(Some(HealthState::Unhealthy)),
            _ => Err(invalid(
                "status",
                format!("unknown status '{}', expected healthy, degraded or unhealthy", raw),
            )),
        },
    }
}
