//! Agent record persistence
//!
//! The registry only needs keyed upsert/get/list/delete. Backends are
//! injected as `Arc<dyn AgentStore>`; `TimeoutStore` bounds every call.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::types::AgentRecord;
use crate::{RegistryError, Result};

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryAgentStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteAgentStore;

/// Durable mapping from agent id to its record
#[async_trait]
pub trait AgentStore: Send + Sync {
    /// Insert or overwrite the record keyed by `record.agent_id`
    async fn upsert(&self, record: &AgentRecord) -> Result<()>;

    async fn get(&self, agent_id: &str) -> Result<Option<AgentRecord>>;

    async fn list(&self) -> Result<Vec<AgentRecord>>;

    /// Returns `false` when there was nothing to delete
    async fn delete(&self, agent_id: &str) -> Result<bool>;
}

/// Store decorator that fails calls exceeding a deadline
pub struct TimeoutStore {
    inner: Arc<dyn AgentStore>,
    timeout: Duration,
}

impl TimeoutStore {
    pub fn new(inner: Arc<dyn AgentStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "store call timed out");
                Err(RegistryError::StoreTimeout(self.timeout))
            }
        }
    }
}

#[async_trait]
impl AgentStore for TimeoutStore {
    async fn upsert(&self, record: &AgentRecord) -> Result<()> {
        self.bounded("upsert", self.inner.upsert(record)).await
    }

    async fn get(&self, agent_id: &str) -> Result<Option<AgentRecord>> {
        self.bounded("get", self.inner.get(agent_id)).await
    }

    async fn list(&self) -> Result<Vec<AgentRecord>> {
        self.bounded("list", self.inner.list()).await
    }

    async fn delete(&self, agent_id: &str) -> Result<bool> {
        self.bounded("delete", self.inner.delete(agent_id)).await
    }
}
