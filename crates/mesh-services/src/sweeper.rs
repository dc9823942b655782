//! Timer-driven health sweep

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::traits::RegistryService;
use crate::types::{ServiceError, ServiceResult, SweepReport};

/// Runs `RegistryService::sweep` every `interval` while this replica leads
pub struct HealthSweeper {
    service: Arc<dyn RegistryService>,
    interval: Duration,
}

impl HealthSweeper {
    pub fn new(service: Arc<dyn RegistryService>, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// One tick; `None` when skipped or failed
    pub async fn run_once(&self) -> Option<SweepReport> {
        if !self.service.is_leader() {
            debug!("not the leader, skipping health sweep");
            return None;
        }
        match self.service.sweep().await {
            Ok(report) => Some(report),
            Err(ServiceError::NotLeader) => None,
            Err(e) => {
                warn!(error = %e, "health sweep failed");
                None
            }
        }
    }

    /// Sweep until `shutdown` flips to `true`
    ///
    /// The first tick fires one interval after spawning.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "health sweeper started");
            let start = tokio::time::Instant::now() + self.interval;
            let mut interval = tokio::time::interval_at(start, self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.run_once().await;
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("health sweeper stopped");
        })
    }
}

/// Single sweep before serving, so records left by a previous process are
/// judged on their persisted heartbeat times
pub async fn startup_cleanup(service: &dyn RegistryService) -> ServiceResult<SweepReport> {
    if !service.is_leader() {
        info!("not the leader, skipping startup cleanup");
        return Ok(SweepReport::default());
    }
    let report = service.sweep().await?;
    info!(
        examined = report.examined,
        demoted = report.demoted,
        evicted = report.evicted,
        "startup cleanup finished"
    );
    Ok(report)
}
