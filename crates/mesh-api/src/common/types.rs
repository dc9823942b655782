// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

//! Extractors and shared state for endpoints
//!
//! `ApiJson`, `ApiQuery` and `ApiPath` wrap the axum extractors so that
//! malformed input is reported with the regular `ApiError` body instead of
//! axum's plain-text rejections.

use axum::extract::FromRequest;
use axum::extract::FromRequestParts;

use super::ApiError;

pub use crate::transports::http::server::ApiState;
pub use axum::extract::State;
pub use axum::Json;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
