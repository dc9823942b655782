//! In-process agent store

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::AgentStore;
use crate::types::AgentRecord;
use crate::Result;

/// HashMap-backed store for single-replica deployments and tests
#[derive(Default)]
pub struct MemoryAgentStore {
    records: RwLock<HashMap<String, AgentRecord>>,
}

impl MemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentStore for MemoryAgentStore {
    async fn upsert(&self, record: &AgentRecord) -> Result<()> {
        self.records
            .write()
            .insert(record.agent_id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, agent_id: &str) -> Result<Option<AgentRecord>> {
        Ok(self.records.read().get(agent_id).cloned())
    }

    async fn list(&self) -> Result<Vec<AgentRecord>> {
        let mut records: Vec<AgentRecord> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(records)
    }

    async fn delete(&self, agent_id: &str) -> Result<bool> {
        Ok(self.records.write().remove(agent_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let store = MemoryAgentStore::new();
        let mut record = AgentRecord::new("a1", Utc::now());
        store.upsert(&record).await.unwrap();

        record.endpoint = "http://a1:9000".to_string();
        store.upsert(&record).await.unwrap();

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].endpoint, "http://a1:9000");
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_error() {
        let store = MemoryAgentStore::new();
        assert!(!store.delete("missing").await.unwrap());
        assert_eq!(store.get("missing").await.unwrap(), None);
    }
}
