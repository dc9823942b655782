// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

// Middleware for HTTP requests

pub mod cors;
pub mod deadline;
