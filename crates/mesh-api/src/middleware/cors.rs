// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

// CORS middleware for HTTP API

use tower_http::cors::{Any, CorsLayer};

/// Allow any origin, without credentials; health headers are exposed
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            axum::http::HeaderName::from_static("x-health-status"),
            axum::http::HeaderName::from_static("x-service-version"),
            axum::http::HeaderName::from_static("x-uptime-seconds"),
        ])
        .allow_credentials(false)
}
