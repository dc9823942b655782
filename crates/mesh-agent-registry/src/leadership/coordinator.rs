//! Lease renewal loop and local leadership view

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use super::LeaseProvider;

/// Tracks whether this replica may accept writes
///
/// `is_leader()` turns false as soon as the local deadline passes, without
/// waiting for a failed renewal. The deadline is measured from the moment a
/// renewal was *sent* and shortened by a safety margin, so this replica
/// always stops writing before any other replica can take the lease.
pub struct LeadershipCoordinator {
    provider: Option<Arc<dyn LeaseProvider>>,
    holder: String,
    ttl: Duration,
    deadline: Mutex<Option<Instant>>,
    /// Bumped each time this replica goes from follower to leader
    term: AtomicU64,
}

impl LeadershipCoordinator {
    pub fn new(provider: Arc<dyn LeaseProvider>, holder: impl Into<String>, ttl: Duration) -> Self {
        Self {
            provider: Some(provider),
            holder: holder.into(),
            ttl,
            deadline: Mutex::new(None),
            term: AtomicU64::new(0),
        }
    }

    /// Single-replica mode: always the leader, nothing to renew
    pub fn disabled(holder: impl Into<String>) -> Self {
        Self {
            provider: None,
            holder: holder.into(),
            ttl: Duration::ZERO,
            deadline: Mutex::new(None),
            term: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    pub fn is_leader(&self) -> bool {
        if self.provider.is_none() {
            return true;
        }
        let deadline = *self.deadline.lock();
        deadline.map(|d| Instant::now() < d).unwrap_or(false)
    }

    /// Leadership term held by this replica
    ///
    /// Anything derived from the store while leading is stale once the term
    /// changes, since another replica may have written in between.
    pub fn term(&self) -> u64 {
        self.term.load(Ordering::Acquire)
    }

    pub fn renew_interval(&self) -> Duration {
        self.ttl / 3
    }

    fn safety_margin(&self) -> Duration {
        self.ttl / 10
    }

    /// One acquire-or-renew round; returns whether we lead afterwards
    pub async fn tick(&self) -> bool {
        let Some(provider) = &self.provider else {
            return true;
        };

        let was_leader = self.is_leader();
        let started = Instant::now();
        let outcome = if was_leader {
            provider.renew(&self.holder, self.ttl).await
        } else {
            provider.try_acquire(&self.holder, self.ttl).await
        };

        match outcome {
            Ok(true) => {
                *self.deadline.lock() = Some(started + self.ttl - self.safety_margin());
                if !was_leader {
                    let term = self.term.fetch_add(1, Ordering::AcqRel) + 1;
                    info!(holder = %self.holder, term, ttl_secs = self.ttl.as_secs(), "acquired registry leadership");
                }
            }
            Ok(false) => {
                *self.deadline.lock() = None;
                if was_leader {
                    warn!(holder = %self.holder, "lost registry leadership");
                }
            }
            Err(e) => {
                // Keep the old deadline; it lapses on its own
                warn!(holder = %self.holder, error = %e, "lease round failed");
            }
        }
        self.is_leader()
    }

    /// Give the lease up so another replica can take over immediately
    pub async fn step_down(&self) {
        let Some(provider) = &self.provider else {
            return;
        };
        let held = self.deadline.lock().take().is_some();
        if held {
            match provider.release(&self.holder).await {
                Ok(()) => info!(holder = %self.holder, "released registry leadership"),
                Err(e) => warn!(holder = %self.holder, error = %e, "failed to release lease"),
            }
        }
    }

    /// Run the renewal loop until `shutdown` flips to `true`
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            if !self.is_enabled() {
                return;
            }
            let mut interval = tokio::time::interval(self.renew_interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.tick().await;
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            self.step_down().await;
        })
    }
}
