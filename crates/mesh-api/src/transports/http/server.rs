// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

// HTTP server implementation (Axum)
//
// Routing, middleware and shared state for the registry REST API.

use axum::{
    middleware,
    routing::{get, head, post},
    Json, Router,
};
use mesh_services::RegistryService;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::common::ApiError;
use crate::endpoints::{agents, health, heartbeat};
use crate::middleware::{cors::create_cors_layer, deadline::enforce_request_deadline};
use crate::openapi::ApiDoc;

/// Application state shared across all HTTP handlers
#[derive(Clone)]
pub struct ApiState {
    pub registry_service: Arc<dyn RegistryService>,
    pub service_name: String,
    pub request_timeout: Duration,
    pub started_at: Instant,
}

impl ApiState {
    pub fn new(registry_service: Arc<dyn RegistryService>, service_name: impl Into<String>) -> Self {
        Self {
            registry_service,
            service_name: service_name.into(),
            request_timeout: Duration::from_secs(10),
            started_at: Instant::now(),
        }
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Create the main HTTP server application
pub fn create_http_server(state: ApiState) -> Router {
    Router::new()
        .route("/", get(health::root_info))
        .route("/health", get(health::health_check).head(health::health_head))
        .route("/agents", get(agents::list_agents))
        .route("/agents/register", post(agents::register_agent))
        .route(
            "/agents/:agent_id",
            get(agents::get_agent).delete(agents::deregister_agent),
        )
        .route("/heartbeat", post(heartbeat::heartbeat))
        .route("/heartbeat/:agent_id", head(heartbeat::heartbeat_check))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .fallback(|| async {
            tracing::debug!("unmatched request");
            ApiError::not_found("no such endpoint")
        })
        .layer(middleware::from_fn_with_state(
            state.clone(),
            enforce_request_deadline,
        ))
        .with_state(state)
        .layer(create_cors_layer())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::span!(
                        tracing::Level::DEBUG,
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version()
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    tracing::debug!("incoming request: {} {}", request.method(), request.uri());
                })
                .on_response(|response: &axum::http::Response<_>, latency: Duration, _span: &tracing::Span| {
                    tracing::debug!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis() as u64,
                        "response"
                    );
                })
                .on_failure(|error: tower_http::classify::ServerErrorsFailureClass, latency: Duration, _span: &tracing::Span| {
                    tracing::error!(%error, latency_ms = latency.as_millis() as u64, "request failed");
                }),
        )
}
