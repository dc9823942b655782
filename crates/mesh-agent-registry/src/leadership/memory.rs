//! In-process lease, for single-process deployments and tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use super::LeaseProvider;
use crate::Result;

struct Lease {
    holder: String,
    expires_at: Instant,
}

#[derive(Default)]
pub struct MemoryLeaseProvider {
    lease: Mutex<Option<Lease>>,
}

impl MemoryLeaseProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holder(&self) -> Option<String> {
        let now = Instant::now();
        self.lease
            .lock()
            .as_ref()
            .filter(|lease| lease.expires_at > now)
            .map(|lease| lease.holder.clone())
    }
}

#[async_trait]
impl LeaseProvider for MemoryLeaseProvider {
    async fn try_acquire(&self, holder: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut lease = self.lease.lock();
        let free = match lease.as_ref() {
            None => true,
            Some(current) => current.holder == holder || current.expires_at <= now,
        };
        if free {
            *lease = Some(Lease {
                holder: holder.to_string(),
                expires_at: now + ttl,
            });
        }
        Ok(free)
    }

    async fn renew(&self, holder: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut lease = self.lease.lock();
        match lease.as_mut() {
            Some(current) if current.holder == holder && current.expires_at > now => {
                current.expires_at = now + ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, holder: &str) -> Result<()> {
        let mut lease = self.lease.lock();
        if lease.as_ref().map(|l| l.holder == holder).unwrap_or(false) {
            *lease = None;
        }
        Ok(())
    }
}
