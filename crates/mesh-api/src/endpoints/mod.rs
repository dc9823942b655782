// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

// HTTP endpoint handlers

pub mod agents;
pub mod health;
pub mod heartbeat;
