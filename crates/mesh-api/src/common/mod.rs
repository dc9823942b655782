// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

// Common types used across endpoints

pub mod error;
pub mod types;
pub use types::{ApiJson, ApiPath, ApiQuery, ApiState, Json, State};

pub use error::{ApiError, ApiErrorCode};

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
