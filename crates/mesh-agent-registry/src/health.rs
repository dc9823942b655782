//! Heartbeat-driven health state machine
//!
//! Demotions (`Healthy -> Degraded -> Unhealthy -> Evicted`) are driven by
//! the background sweep, one step per record per tick. Promotions happen on
//! heartbeat.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::types::{AgentRecord, HealthState};

/// Degrade and eviction thresholds for one agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthThresholds {
    pub timeout: Duration,
    pub eviction: Duration,
}

impl HealthThresholds {
    /// State implied by heartbeat silence alone
    pub fn classify(&self, silence: Duration) -> HealthState {
        if silence < self.timeout {
            HealthState::Healthy
        } else if silence < self.eviction {
            HealthState::Degraded
        } else {
            HealthState::Unhealthy
        }
    }

    /// Worse of the stored state and the timing-implied state
    ///
    /// Keeps a silent provider from ranking as healthy between sweep ticks.
    pub fn effective(&self, stored: HealthState, silence: Duration) -> HealthState {
        match stored {
            HealthState::Evicted => HealthState::Evicted,
            HealthState::Registering => HealthState::Registering,
            _ => stored.worst(self.classify(silence)),
        }
    }
}

/// What the sweep should do with a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAction {
    Demote(HealthState),
    Evict,
}

/// Registry-wide health timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    pub timeout_threshold: Duration,
    pub eviction_threshold: Duration,
    /// Extra retention for unhealthy records before eviction
    pub eviction_grace: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            timeout_threshold: Duration::from_secs(60),
            eviction_threshold: Duration::from_secs(120),
            eviction_grace: Duration::from_secs(60),
        }
    }
}

impl HealthPolicy {
    pub fn new(timeout_threshold: Duration, eviction_threshold: Duration, eviction_grace: Duration) -> Self {
        Self {
            timeout_threshold,
            eviction_threshold,
            eviction_grace,
        }
    }

    /// Thresholds for a record, honouring its per-agent overrides
    ///
    /// An override of only the timeout never leaves eviction below it.
    pub fn thresholds_for(&self, record: &AgentRecord) -> HealthThresholds {
        let timeout = record
            .timeout_threshold_secs
            .map(Duration::from_secs)
            .unwrap_or(self.timeout_threshold);
        let eviction = record
            .eviction_threshold_secs
            .map(Duration::from_secs)
            .unwrap_or(self.eviction_threshold);
        HealthThresholds {
            timeout,
            eviction: eviction.max(timeout),
        }
    }

    pub fn effective_health(&self, record: &AgentRecord, now: DateTime<Utc>) -> HealthState {
        self.thresholds_for(record)
            .effective(record.health, record.silence(now))
    }

    /// Next demotion for a record, if any is due
    ///
    /// Never skips a state: a record silent for long enough to be evicted
    /// still walks through `Degraded` and `Unhealthy` on successive ticks.
    pub fn next_step(&self, record: &AgentRecord, now: DateTime<Utc>) -> Option<SweepAction> {
        let silence = record.silence(now);
        let thresholds = self.thresholds_for(record);

        match record.health {
            HealthState::Registering | HealthState::Healthy if silence >= thresholds.timeout => {
                Some(SweepAction::Demote(HealthState::Degraded))
            }
            HealthState::Degraded if silence >= thresholds.eviction => {
                Some(SweepAction::Demote(HealthState::Unhealthy))
            }
            HealthState::Unhealthy if silence >= thresholds.eviction + self.eviction_grace => {
                Some(SweepAction::Evict)
            }
            _ => None,
        }
    }
}

/// State after a successful heartbeat carrying an optional self-report
///
/// Self-reports can only pick `Healthy` or `Degraded`; `Unhealthy` is
/// decided by the registry alone and is clamped.
pub fn heartbeat_state(reported: Option<HealthState>) -> HealthState {
    match reported {
        Some(HealthState::Degraded) | Some(HealthState::Unhealthy) => HealthState::Degraded,
        _ => HealthState::Healthy,
    }
}
