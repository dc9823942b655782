//! Dependency resolution
//!
//! Pure functions over a snapshot of candidates: the same candidates,
//! dependency and `now` always produce the same winner regardless of the
//! order candidates are presented in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

use crate::health::HealthThresholds;
use crate::matching::{match_tags, version_matches};
use crate::types::{DependencySpec, HealthState};

/// Score bonus for a provider whose effective health is `Healthy`
pub const HEALTHY_BONUS: u32 = 1000;

/// One provider slot: an agent offering one capability declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub agent_id: String,
    /// Position of the declaration in the agent's capability list
    pub slot: usize,
    pub endpoint: String,
    pub capability: String,
    pub tags: BTreeSet<String>,
    pub version: String,
    pub health: HealthState,
    pub last_heartbeat_at: DateTime<Utc>,
    pub thresholds: HealthThresholds,
}

impl Candidate {
    pub fn effective_health(&self, now: DateTime<Utc>) -> HealthState {
        let silence = (now - self.last_heartbeat_at).to_std().unwrap_or_default();
        self.thresholds.effective(self.health, silence)
    }
}

/// The provider chosen for a dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedProvider {
    pub agent_id: String,
    pub endpoint: String,
    pub capability: String,
    pub tags: Vec<String>,
    pub version: String,
}

/// Outcome for one declared dependency
///
/// `provider: None` is graceful absence, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    /// Position of the dependency in the agent's dependency list
    pub dep_index: usize,
    pub capability: String,
    pub provider: Option<ResolvedProvider>,
}

impl ResolutionResult {
    pub fn is_resolved(&self) -> bool {
        self.provider.is_some()
    }
}

/// What a dependent last saw for one of its dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownResolution {
    pub dep_index: usize,
    /// Absent means the dependent believes the dependency is unresolved
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Score a candidate, or `None` if it is not eligible
fn score(candidate: &Candidate, spec: &DependencySpec, now: DateTime<Utc>) -> Option<u32> {
    if candidate.capability != spec.capability {
        return None;
    }
    let health = candidate.effective_health(now);
    if !health.is_resolvable() {
        return None;
    }
    let tag_score = match_tags(&candidate.tags, &spec.tags)?;
    if !version_matches(&candidate.version, &spec.version_constraint) {
        return None;
    }
    let health_bonus = if health == HealthState::Healthy {
        HEALTHY_BONUS
    } else {
        0
    };
    Some(health_bonus + tag_score)
}

/// Pick the best provider for one dependency
///
/// Highest score wins; ties go to the most recent heartbeat, then to the
/// lexicographically smallest `agent_id`, then to the lowest slot.
pub fn resolve<'a, I>(
    dep_index: usize,
    spec: &DependencySpec,
    candidates: I,
    now: DateTime<Utc>,
) -> ResolutionResult
where
    I: IntoIterator<Item = &'a Candidate>,
{
    let winner = candidates
        .into_iter()
        .filter_map(|c| score(c, spec, now).map(|s| (s, c)))
        .max_by_key(|&(s, c)| (s, c.last_heartbeat_at, Reverse(c.agent_id.as_str()), Reverse(c.slot)))
        .map(|(_, c)| ResolvedProvider {
            agent_id: c.agent_id.clone(),
            endpoint: c.endpoint.clone(),
            capability: c.capability.clone(),
            tags: c.tags.iter().cloned().collect(),
            version: c.version.clone(),
        });

    ResolutionResult {
        dep_index,
        capability: spec.capability.clone(),
        provider: winner,
    }
}

/// Keep only resolutions that differ from what the dependent already knows
///
/// With no known state every resolution is reported. A dependency the
/// dependent did not mention is always reported.
pub fn changed_since(
    current: Vec<ResolutionResult>,
    known: Option<&[KnownResolution]>,
) -> Vec<ResolutionResult> {
    let known = match known {
        Some(known) => known,
        None => return current,
    };
    let by_index: HashMap<usize, &KnownResolution> =
        known.iter().map(|k| (k.dep_index, k)).collect();

    current
        .into_iter()
        .filter(|result| match by_index.get(&result.dep_index) {
            None => true,
            Some(previous) => match &result.provider {
                None => previous.agent_id.is_some(),
                Some(provider) => {
                    previous.agent_id.as_deref() != Some(provider.agent_id.as_str())
                        || previous.endpoint.as_deref() != Some(provider.endpoint.as_str())
                }
            },
        })
        .collect()
}
