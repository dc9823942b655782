// Copyright 2025 MCP Mesh Contributors
// SPDX-License-Identifier: Apache-2.0

//! Registry service implementation
//!
//! Every mutation follows the same order under the agent's lock: store
//! write first, then the capability index update with no `.await` in
//! between. A request cancelled at any await point therefore leaves either
//! no trace or a stored record the next heartbeat or sweep re-indexes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mesh_agent_registry::{
    changed_since, heartbeat_state, AgentRecord, AgentStore, CapabilityIndex, HealthPolicy,
    HealthState, KeyedLocks, LeadershipCoordinator, SweepAction,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::traits::RegistryService;
use crate::types::*;
use crate::validation::{normalize_metadata, parse_reported_status, validate_agent_id};

pub const DEFAULT_SWEEP_BATCH_SIZE: usize = 256;

/// Marks an index that has never been loaded from the store
const UNSYNCED_TERM: u64 = u64::MAX;

enum SweepStep {
    Demoted,
    Evicted,
    Skipped,
}

pub struct RegistryServiceImpl {
    store: Arc<dyn AgentStore>,
    index: CapabilityIndex,
    locks: KeyedLocks,
    policy: HealthPolicy,
    leadership: Arc<LeadershipCoordinator>,
    sweep_batch_size: usize,
    /// Topology revision each agent saw on its last full heartbeat
    seen_revisions: Mutex<HashMap<String, u64>>,
    /// Leadership term the index was last loaded in; a new term reloads it
    /// from the store before the next write
    synced_term: AtomicU64,
    sync_lock: tokio::sync::Mutex<()>,
}

impl RegistryServiceImpl {
    pub fn new(
        store: Arc<dyn AgentStore>,
        policy: HealthPolicy,
        leadership: Arc<LeadershipCoordinator>,
    ) -> Self {
        Self {
            store,
            index: CapabilityIndex::new(),
            locks: KeyedLocks::new(),
            policy,
            leadership,
            sweep_batch_size: DEFAULT_SWEEP_BATCH_SIZE,
            seen_revisions: Mutex::new(HashMap::new()),
            synced_term: AtomicU64::new(UNSYNCED_TERM),
            sync_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_sweep_batch_size(mut self, batch_size: usize) -> Self {
        self.sweep_batch_size = batch_size.max(1);
        self
    }

    pub fn index(&self) -> &CapabilityIndex {
        &self.index
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    /// Gate for every mutating operation
    async fn require_leader(&self) -> ServiceResult<()> {
        if !self.leadership.is_leader() {
            return Err(ServiceError::NotLeader);
        }
        let term = self.leadership.term();
        if self.synced_term.load(Ordering::Acquire) != term {
            let _guard = self.sync_lock.lock().await;
            if self.synced_term.load(Ordering::Acquire) != term {
                self.reload_index().await?;
                self.synced_term.store(term, Ordering::Release);
                debug!(term, "capability index synced for leadership term");
            }
        }
        Ok(())
    }

    /// Rebuild the capability index from the store
    ///
    /// Needed on startup with a persistent store and whenever this replica
    /// (re)gains leadership, since another replica may have written meanwhile.
    pub async fn reload_index(&self) -> ServiceResult<usize> {
        let records = self.store.list().await?;
        let live: HashSet<&str> = records.iter().map(|r| r.agent_id.as_str()).collect();

        for agent_id in self.index.agent_ids() {
            if !live.contains(agent_id.as_str()) {
                self.index.remove_agent(&agent_id);
            }
        }
        for record in &records {
            self.index.upsert_agent(record, &self.policy);
        }

        info!(agents = records.len(), revision = self.index.revision(), "capability index loaded from store");
        Ok(records.len())
    }

    fn snapshot(&self, record: AgentRecord, now: DateTime<Utc>) -> AgentSnapshot {
        let health = self.policy.effective_health(&record, now);
        AgentSnapshot { record, health }
    }

    fn forget(&self, agent_id: &str) {
        self.index.remove_agent(agent_id);
        self.seen_revisions.lock().remove(agent_id);
    }

    async fn sweep_record(
        &self,
        seen: &AgentRecord,
        action: SweepAction,
    ) -> ServiceResult<SweepStep> {
        let _guard = self.locks.lock(&seen.agent_id).await;

        let mut current = match self.store.get(&seen.agent_id).await? {
            Some(current) => current,
            None => {
                self.forget(&seen.agent_id);
                return Ok(SweepStep::Skipped);
            }
        };
        // A heartbeat or re-registration landed after the listing
        if current.last_heartbeat_at != seen.last_heartbeat_at || current.health != seen.health {
            return Ok(SweepStep::Skipped);
        }

        match action {
            SweepAction::Demote(state) => {
                let from = current.health;
                current.health = state;
                self.store.upsert(&current).await?;
                self.index.upsert_agent(&current, &self.policy);
                info!(agent_id = %current.agent_id, from = %from, to = %state, "agent demoted");
                Ok(SweepStep::Demoted)
            }
            SweepAction::Evict => {
                self.store.delete(&current.agent_id).await?;
                self.forget(&current.agent_id);
                info!(agent_id = %current.agent_id, "agent evicted");
                Ok(SweepStep::Evicted)
            }
        }
    }
}

#[async_trait]
impl RegistryService for RegistryServiceImpl {
    async fn register(&self, params: RegisterParams) -> ServiceResult<RegisterOutcome> {
        let RegisterParams {
            agent_id,
            mut metadata,
        } = params;
        validate_agent_id(&agent_id)?;
        normalize_metadata(&agent_id, &mut metadata)?;
        self.require_leader().await?;

        let _guard = self.locks.lock(&agent_id).await;
        let now = Utc::now();
        let existing = self.store.get(&agent_id).await?;

        let mut record = AgentRecord::new(&agent_id, now);
        if let Some(existing) = &existing {
            record.registered_at = existing.registered_at;
        }
        metadata.apply_to(&mut record);
        // `Registering` ends here, before anything is persisted or indexed
        record.touch(now, HealthState::Healthy);

        self.store.upsert(&record).await?;
        self.index.upsert_agent(&record, &self.policy);
        let revision = self.index.revision();
        let resolutions = self.index.resolve_all(&record.dependencies, now);
        self.seen_revisions.lock().insert(agent_id.clone(), revision);

        info!(
            agent_id = %agent_id,
            capabilities = record.capabilities.len(),
            dependencies = record.dependencies.len(),
            resolved = resolutions.iter().filter(|r| r.is_resolved()).count(),
            reregistered = existing.is_some(),
            "agent registered"
        );

        Ok(RegisterOutcome {
            agent_id,
            timestamp: now,
            resolutions,
        })
    }

    async fn heartbeat(&self, params: HeartbeatParams) -> ServiceResult<HeartbeatOutcome> {
        let HeartbeatParams {
            agent_id,
            status,
            metadata,
            known_resolutions,
        } = params;
        validate_agent_id(&agent_id)?;
        let reported = parse_reported_status(status.as_deref())?;
        let metadata = match metadata {
            Some(mut metadata) => {
                normalize_metadata(&agent_id, &mut metadata)?;
                Some(metadata)
            }
            None => None,
        };
        self.require_leader().await?;

        let _guard = self.locks.lock(&agent_id).await;
        let mut record = self
            .store
            .get(&agent_id)
            .await?
            .ok_or_else(|| ServiceError::NotRegistered(agent_id.clone()))?;

        let now = Utc::now();
        let previous = record.health;
        if let Some(metadata) = &metadata {
            metadata.apply_to(&mut record);
        }
        record.touch(now, heartbeat_state(reported));

        self.store.upsert(&record).await?;
        self.index.upsert_agent(&record, &self.policy);
        let revision = self.index.revision();
        let current = self.index.resolve_all(&record.dependencies, now);
        self.seen_revisions.lock().insert(agent_id.clone(), revision);

        if previous != record.health {
            info!(agent_id = %agent_id, from = %previous, to = %record.health, "agent health changed on heartbeat");
        } else {
            debug!(agent_id = %agent_id, "heartbeat");
        }

        Ok(HeartbeatOutcome {
            timestamp: now,
            health: record.health,
            resolutions: changed_since(current, known_resolutions.as_deref()),
        })
    }

    async fn check_heartbeat(&self, agent_id: &str) -> ServiceResult<HeartbeatCheck> {
        if self.store.get(agent_id).await?.is_none() {
            return Err(ServiceError::NotRegistered(agent_id.to_string()));
        }
        let revision = self.index.revision();
        let seen = self.seen_revisions.lock().get(agent_id).copied();
        Ok(match seen {
            Some(seen) if seen >= revision => HeartbeatCheck::Unchanged,
            _ => HeartbeatCheck::TopologyChanged,
        })
    }

    async fn list_agents(&self, filter: AgentFilter) -> ServiceResult<Vec<AgentSnapshot>> {
        let now = Utc::now();
        let records = self.store.list().await?;
        Ok(records
            .into_iter()
            .map(|record| self.snapshot(record, now))
            .filter(|snapshot| filter.matches(snapshot))
            .collect())
    }

    async fn get_agent(&self, agent_id: &str) -> ServiceResult<AgentSnapshot> {
        let record = self
            .store
            .get(agent_id)
            .await?
            .ok_or_else(|| ServiceError::NotRegistered(agent_id.to_string()))?;
        Ok(self.snapshot(record, Utc::now()))
    }

    async fn deregister(&self, agent_id: &str) -> ServiceResult<bool> {
        self.require_leader().await?;
        // An id that fails validation can never have been registered
        if validate_agent_id(agent_id).is_err() {
            debug!(agent_id_len = agent_id.len(), "deregister for invalid agent id");
            return Ok(false);
        }

        let _guard = self.locks.lock(agent_id).await;
        let existed = self.store.delete(agent_id).await?;
        self.forget(agent_id);

        if existed {
            info!(agent_id = %agent_id, "agent deregistered");
        } else {
            debug!(agent_id = %agent_id, "deregister for unknown agent");
        }
        Ok(existed)
    }

    async fn sweep(&self) -> ServiceResult<SweepReport> {
        self.require_leader().await?;

        let now = Utc::now();
        let records = self.store.list().await?;
        let mut report = SweepReport::default();

        for chunk in records.chunks(self.sweep_batch_size) {
            if !self.leadership.is_leader() {
                warn!("leadership lost during health sweep, stopping early");
                break;
            }
            for record in chunk {
                report.examined += 1;
                let Some(action) = self.policy.next_step(record, now) else {
                    continue;
                };
                match self.sweep_record(record, action).await {
                    Ok(SweepStep::Demoted) => report.demoted += 1,
                    Ok(SweepStep::Evicted) => report.evicted += 1,
                    Ok(SweepStep::Skipped) => report.skipped += 1,
                    Err(e) => {
                        report.failed += 1;
                        warn!(agent_id = %record.agent_id, error = %e, "health sweep failed for agent");
                    }
                }
            }
            tokio::task::yield_now().await;
        }

        if report.changed_anything() || report.failed > 0 {
            info!(
                examined = report.examined,
                demoted = report.demoted,
                evicted = report.evicted,
                skipped = report.skipped,
                failed = report.failed,
                "health sweep finished"
            );
        } else {
            debug!(examined = report.examined, "health sweep finished, nothing to do");
        }
        Ok(report)
    }

    fn stats(&self) -> RegistryStats {
        RegistryStats {
            agent_count: self.index.agent_count(),
            topology_revision: self.index.revision(),
            is_leader: self.leadership.is_leader(),
        }
    }

    fn is_leader(&self) -> bool {
        self.leadership.is_leader()
    }
}
