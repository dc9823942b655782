//! Lease row in a shared SQLite database
//!
//! Expiry is compared against wall-clock milliseconds written by the
//! replicas themselves, so replicas sharing a database must have roughly
//! synchronized clocks. The coordinator's safety margin absorbs small skew.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::time::Duration;

use super::{LeaseProvider, LEADER_LEASE};
use crate::Result;

pub struct SqliteLeaseProvider {
    pool: SqlitePool,
    name: String,
}

impl SqliteLeaseProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            name: LEADER_LEASE.to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn ttl_ms(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}

#[async_trait]
impl LeaseProvider for SqliteLeaseProvider {
    async fn try_acquire(&self, holder: &str, ttl: Duration) -> Result<bool> {
        let now = now_ms();
        let result = sqlx::query(
            "INSERT INTO leases (name, holder, expires_at_ms) VALUES (?, ?, ?) \
             ON CONFLICT (name) DO UPDATE SET \
                 holder = excluded.holder, \
                 expires_at_ms = excluded.expires_at_ms \
             WHERE leases.holder = excluded.holder OR leases.expires_at_ms <= ?",
        )
        .bind(&self.name)
        .bind(holder)
        .bind(now.saturating_add(ttl_ms(ttl)))
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn renew(&self, holder: &str, ttl: Duration) -> Result<bool> {
        let now = now_ms();
        let result = sqlx::query(
            "UPDATE leases SET expires_at_ms = ? \
             WHERE name = ? AND holder = ? AND expires_at_ms > ?",
        )
        .bind(now.saturating_add(ttl_ms(ttl)))
        .bind(&self.name)
        .bind(holder)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn release(&self, holder: &str) -> Result<()> {
        sqlx::query("DELETE FROM leases WHERE name = ? AND holder = ?")
            .bind(&self.name)
            .bind(holder)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
