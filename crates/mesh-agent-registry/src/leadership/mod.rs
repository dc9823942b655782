//! Single-writer coordination between registry replicas
//!
//! A replica writes only while it holds a renewable lease. The lease
//! primitive is pluggable; the coordinator owns the renewal loop and the
//! local view of whether this replica may still write.

use async_trait::async_trait;
use std::time::Duration;

use crate::Result;

pub mod coordinator;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use coordinator::LeadershipCoordinator;
pub use memory::MemoryLeaseProvider;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteLeaseProvider;

/// Name of the lease every replica competes for
pub const LEADER_LEASE: &str = "mesh-registry-leader";

/// Distributed lease primitive
///
/// Implementations must never grant the lease to a second holder before the
/// current holder's TTL has elapsed.
#[async_trait]
pub trait LeaseProvider: Send + Sync {
    /// Take the lease if it is free, expired, or already ours
    async fn try_acquire(&self, holder: &str, ttl: Duration) -> Result<bool>;

    /// Extend a lease we still hold; `false` if it lapsed or was taken
    async fn renew(&self, holder: &str, ttl: Duration) -> Result<bool>;

    async fn release(&self, holder: &str) -> Result<()>;
}
