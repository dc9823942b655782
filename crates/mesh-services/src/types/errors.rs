// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

/*!
Service layer error types.

Transport-agnostic errors that adapters map onto their own status codes.
A dependency that resolves to nothing is not an error and never shows up here.
*/

use mesh_agent_registry::RegistryError;
use thiserror::Error;

/// Service layer errors (transport-agnostic)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Malformed or missing fields (400 in HTTP)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Heartbeat or lookup for an unknown agent (404 in HTTP); caller must re-register
    #[error("Agent not registered: {0}")]
    NotRegistered(String),

    /// Persistence timed out or failed (503 in HTTP); safe to retry with backoff
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Request deadline elapsed before the operation finished (503 in HTTP)
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// This replica does not hold the leadership lease (503 in HTTP)
    #[error("This registry replica is not the leader")]
    NotLeader,

    /// Reserved for optimistic-concurrency failures (409 in HTTP)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal service error (500 in HTTP)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

// ============================================================================
// ERROR CONVERSIONS FROM BACKEND
// ============================================================================

impl From<RegistryError> for ServiceError {
    fn from(err: RegistryError) -> Self {
        if err.is_store_failure() {
            return ServiceError::StoreUnavailable(err.to_string());
        }
        match err {
            RegistryError::InvalidRecord(msg) => ServiceError::InvalidRequest(msg),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_store_failures_map_to_unavailable() {
        let err: ServiceError = RegistryError::StoreTimeout(Duration::from_millis(5)).into();
        assert!(matches!(err, ServiceError::StoreUnavailable(_)));

        let err: ServiceError = RegistryError::StoreUnavailable("gone".into()).into();
        assert!(matches!(err, ServiceError::StoreUnavailable(_)));
    }

    #[test]
    fn test_invalid_record_maps_to_invalid_request() {
        let err: ServiceError = RegistryError::InvalidRecord("bad status".into()).into();
        assert_eq!(err, ServiceError::InvalidRequest("bad status".into()));
    }
}
