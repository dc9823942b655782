// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

/*!
Transport-agnostic types for the service layer.
*/

pub mod dtos;
pub mod errors;

// Re-export for convenience
pub use dtos::*;
pub use errors::{ServiceError, ServiceResult};
