/*!
Service implementations.

Default implementation of the registry service over an injected
`AgentStore`, the in-process capability index and a leadership coordinator.
*/

pub mod registry_service_impl;

// Re-export for convenience
pub use registry_service_impl::{RegistryServiceImpl, DEFAULT_SWEEP_BATCH_SIZE};
