//! SQLite-backed agent store
//!
//! Records are stored as JSON documents keyed by `agent_id`; health and
//! heartbeat time are duplicated into columns for inspection with plain SQL.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use super::AgentStore;
use crate::types::AgentRecord;
use crate::{RegistryError, Result};

/// Open (creating if needed) a SQLite database and run migrations
///
/// Accepts `sqlite://path`, `sqlite::memory:` or a plain file path.
pub async fn connect_pool(database_url: &str) -> Result<SqlitePool> {
    let in_memory = database_url.contains(":memory:");
    let options = if database_url.starts_with("sqlite:") {
        SqliteConnectOptions::from_str(database_url)?
    } else {
        SqliteConnectOptions::new().filename(database_url)
    }
    .create_if_missing(true)
    .busy_timeout(Duration::from_secs(5));

    let options = if in_memory {
        options
    } else {
        options.journal_mode(SqliteJournalMode::Wal)
    };

    // Each in-memory connection is its own database
    let max_connections = if in_memory { 1 } else { 4 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    info!(database_url, "DB migration: sqlite");
    sqlx::migrate!("./migrations/sqlite")
        .run(&pool)
        .await
        .map_err(|e| RegistryError::StoreUnavailable(format!("migration failed: {}", e)))?;

    Ok(pool)
}

pub struct SqliteAgentStore {
    pool: SqlitePool,
}

impl SqliteAgentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        Ok(Self::new(connect_pool(database_url).await?))
    }

    /// Shared with the lease provider when both live in one database
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn decode(raw: &str) -> Result<AgentRecord> {
    Ok(serde_json::from_str(raw)?)
}

#[async_trait]
impl AgentStore for SqliteAgentStore {
    async fn upsert(&self, record: &AgentRecord) -> Result<()> {
        let document = serde_json::to_string(record)?;
        sqlx::query(
            "INSERT INTO agents (agent_id, record, health, last_heartbeat_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT (agent_id) DO UPDATE SET \
                 record = excluded.record, \
                 health = excluded.health, \
                 last_heartbeat_at = excluded.last_heartbeat_at, \
                 updated_at = excluded.updated_at",
        )
        .bind(&record.agent_id)
        .bind(document)
        .bind(record.health.as_str())
        .bind(record.last_heartbeat_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, agent_id: &str) -> Result<Option<AgentRecord>> {
        let row = sqlx::query("SELECT record FROM agents WHERE agent_id = ?")
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("record")?;
                Ok(Some(decode(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<AgentRecord>> {
        let rows = sqlx::query("SELECT record FROM agents ORDER BY agent_id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let raw: String = row.try_get("record")?;
                decode(&raw)
            })
            .collect()
    }

    async fn delete(&self, agent_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM agents WHERE agent_id = ?")
            .bind(agent_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CapabilityDeclaration, DependencySpec, HealthState};
    use tempfile::tempdir;

    fn sample(agent_id: &str) -> AgentRecord {
        let mut record = AgentRecord::new(agent_id, Utc::now());
        record.endpoint = format!("http://{}:9000", agent_id);
        record.health = HealthState::Healthy;
        record.capabilities = vec![CapabilityDeclaration::new("date")
            .with_tags(["system"])
            .with_version("1.0.0")];
        record.dependencies = vec![DependencySpec::new("weather")
            .with_tags(vec!["-deprecated".parse().unwrap()])];
        record
    }

    #[tokio::test]
    async fn test_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.db");
        let store = SqliteAgentStore::connect(path.to_str().unwrap()).await.unwrap();

        let record = sample("a1");
        store.upsert(&record).await.unwrap();
        assert_eq!(store.get("a1").await.unwrap(), Some(record.clone()));

        // Survives reopening
        drop(store);
        let reopened = SqliteAgentStore::connect(path.to_str().unwrap()).await.unwrap();
        assert_eq!(reopened.list().await.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn test_upsert_and_delete() {
        let store = SqliteAgentStore::connect("sqlite::memory:").await.unwrap();
        let mut record = sample("a1");
        store.upsert(&record).await.unwrap();

        record.health = HealthState::Degraded;
        store.upsert(&record).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
        assert_eq!(store.get("a1").await.unwrap().unwrap().health, HealthState::Degraded);

        assert!(store.delete("a1").await.unwrap());
        assert!(!store.delete("a1").await.unwrap());
        assert_eq!(store.get("a1").await.unwrap(), None);
    }
}
