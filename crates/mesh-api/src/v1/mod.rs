// Wire contract, version 1 - DTOs and mappings

pub mod agent_dtos;
pub mod health_dtos;

// Re-export for convenience
pub use agent_dtos::*;
pub use health_dtos::*;
