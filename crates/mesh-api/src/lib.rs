// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

//! Mesh Registry REST API Layer
//!
//! Axum handlers, wire DTOs and middleware in front of `mesh-services`.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod common;
pub mod endpoints;
pub mod middleware;
pub mod openapi;
pub mod transports;
pub mod v1;

// Re-export commonly used types
pub use common::{ApiError, ApiErrorCode, ApiResult};
pub use openapi::ApiDoc;
pub use transports::http::{create_http_server, ApiState};
