//! Capability index
//!
//! Derived view of the store: capability name -> provider slots. Updated
//! incrementally per agent; never rebuilt from scratch on the request path.
//! Reads (resolution) share a read lock and never block each other.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::health::HealthPolicy;
use crate::resolver::{resolve, Candidate, ResolutionResult};
use crate::types::{AgentRecord, DependencySpec};

/// Provider slot key: (agent_id, position in the agent's capability list)
type SlotKey = (String, usize);

#[derive(Default)]
struct IndexInner {
    by_capability: HashMap<String, BTreeMap<SlotKey, Candidate>>,
    /// Capability names each agent currently occupies, in slot order
    by_agent: HashMap<String, Vec<String>>,
}

impl IndexInner {
    fn take_agent(&mut self, agent_id: &str) -> Option<Vec<Candidate>> {
        let capabilities = self.by_agent.remove(agent_id)?;
        let mut removed = Vec::with_capacity(capabilities.len());
        for (slot, capability) in capabilities.into_iter().enumerate() {
            if let Some(providers) = self.by_capability.get_mut(&capability) {
                if let Some(candidate) = providers.remove(&(agent_id.to_string(), slot)) {
                    removed.push(candidate);
                }
                if providers.is_empty() {
                    self.by_capability.remove(&capability);
                }
            }
        }
        Some(removed)
    }
}

/// Fields that can change a resolution outcome (heartbeat time aside)
fn same_topology(old: &[Candidate], new: &[Candidate]) -> bool {
    old.len() == new.len()
        && old.iter().zip(new).all(|(a, b)| {
            a.capability == b.capability
                && a.endpoint == b.endpoint
                && a.tags == b.tags
                && a.version == b.version
                && a.health == b.health
                && a.thresholds == b.thresholds
        })
}

/// Build the provider slots an agent record contributes
pub fn candidates_for(record: &AgentRecord, policy: &HealthPolicy) -> Vec<Candidate> {
    let thresholds = policy.thresholds_for(record);
    record
        .capabilities
        .iter()
        .enumerate()
        .map(|(slot, capability)| Candidate {
            agent_id: record.agent_id.clone(),
            slot,
            endpoint: record.endpoint.clone(),
            capability: capability.name.clone(),
            tags: capability.tags.clone(),
            version: capability.version.clone(),
            health: record.health,
            last_heartbeat_at: record.last_heartbeat_at,
            thresholds,
        })
        .collect()
}

/// Queryable index from capability name to candidate providers
pub struct CapabilityIndex {
    inner: RwLock<IndexInner>,
    /// Bumped whenever a change could alter some resolution
    revision: AtomicU64,
}

impl Default for CapabilityIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityIndex {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(IndexInner::default()),
            revision: AtomicU64::new(0),
        }
    }

    /// Insert or replace every slot of an agent
    ///
    /// Returns `true` when the topology revision advanced.
    pub fn upsert_agent(&self, record: &AgentRecord, policy: &HealthPolicy) -> bool {
        let new_candidates = candidates_for(record, policy);
        let mut inner = self.inner.write();

        let previous = inner.take_agent(&record.agent_id);
        let changed = match &previous {
            None => true,
            Some(old) => !same_topology(old, &new_candidates),
        };

        let capabilities = new_candidates.iter().map(|c| c.capability.clone()).collect();
        for candidate in new_candidates {
            inner
                .by_capability
                .entry(candidate.capability.clone())
                .or_default()
                .insert((candidate.agent_id.clone(), candidate.slot), candidate);
        }
        inner.by_agent.insert(record.agent_id.clone(), capabilities);

        if changed {
            let revision = self.revision.fetch_add(1, Ordering::AcqRel) + 1;
            debug!(agent_id = %record.agent_id, revision, "capability index updated");
        }
        changed
    }

    /// Drop every slot of an agent; returns `false` if it was not indexed
    pub fn remove_agent(&self, agent_id: &str) -> bool {
        let removed = self.inner.write().take_agent(agent_id).is_some();
        if removed {
            let revision = self.revision.fetch_add(1, Ordering::AcqRel) + 1;
            debug!(agent_id = %agent_id, revision, "agent removed from capability index");
        }
        removed
    }

    pub fn contains_agent(&self, agent_id: &str) -> bool {
        self.inner.read().by_agent.contains_key(agent_id)
    }

    /// Resolve one dependency against the current providers
    pub fn resolve(&self, dep_index: usize, spec: &DependencySpec, now: DateTime<Utc>) -> ResolutionResult {
        let inner = self.inner.read();
        match inner.by_capability.get(&spec.capability) {
            Some(providers) => resolve(dep_index, spec, providers.values(), now),
            None => resolve(dep_index, spec, std::iter::empty(), now),
        }
    }

    /// Resolve every dependency of an agent, in declaration order
    pub fn resolve_all(&self, dependencies: &[DependencySpec], now: DateTime<Utc>) -> Vec<ResolutionResult> {
        dependencies
            .iter()
            .enumerate()
            .map(|(dep_index, spec)| self.resolve(dep_index, spec, now))
            .collect()
    }

    /// Snapshot of the providers of one capability
    pub fn providers(&self, capability: &str) -> Vec<Candidate> {
        self.inner
            .read()
            .by_capability
            .get(capability)
            .map(|providers| providers.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    pub fn agent_count(&self) -> usize {
        self.inner.read().by_agent.len()
    }

    pub fn agent_ids(&self) -> Vec<String> {
        self.inner.read().by_agent.keys().cloned().collect()
    }
}
