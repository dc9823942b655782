use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use mesh_services::ServiceError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// API error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    InvalidRequest,
    NotRegistered,
    NotFound,
    StoreUnavailable,
    Timeout,
    NotLeader,
    Conflict,
    Internal,
}

impl ApiErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::NotRegistered | ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::StoreUnavailable | ApiErrorCode::Timeout | ApiErrorCode::NotLeader => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiErrorCode::Conflict => StatusCode::CONFLICT,
            ApiErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error body returned by every failing endpoint
#[derive(Debug, Error, Clone, Serialize, Deserialize, ToSchema)]
#[error("{error}")]
pub struct ApiError {
    /// Human-readable message
    pub error: String,
    pub code: ApiErrorCode,
    /// RFC 3339
    pub timestamp: String,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InvalidRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Internal, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Convert service layer errors to API errors
impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let code = match &err {
            ServiceError::InvalidRequest(_) => ApiErrorCode::InvalidRequest,
            ServiceError::NotRegistered(_) => ApiErrorCode::NotRegistered,
            ServiceError::StoreUnavailable(_) => ApiErrorCode::StoreUnavailable,
            ServiceError::Timeout(_) => ApiErrorCode::Timeout,
            ServiceError::NotLeader => ApiErrorCode::NotLeader,
            ServiceError::Conflict(_) => ApiErrorCode::Conflict,
            ServiceError::Internal(_) => ApiErrorCode::Internal,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::invalid_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::invalid_request(rejection.body_text())
    }
}
