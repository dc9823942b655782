/*!
Service trait definitions.

These traits define the stable application boundary between
transport adapters and the registry core.
*/

pub mod registry_service;

// Re-export for convenience
pub use registry_service::RegistryService;
