//! Core types for agent registration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::RegistryError;

/// Lifecycle state of an agent, derived from heartbeat timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Record created, first resolution pass not finished yet
    Registering,
    Healthy,
    /// Late on heartbeats; still resolvable but ranked below healthy providers
    Degraded,
    /// Excluded from resolution; kept so a late heartbeat can recover it
    Unhealthy,
    /// Terminal; the record is gone from store and index
    Evicted,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Registering => "registering",
            HealthState::Healthy => "healthy",
            HealthState::Degraded => "degraded",
            HealthState::Unhealthy => "unhealthy",
            HealthState::Evicted => "evicted",
        }
    }

    /// Whether a provider in this state may be handed out by the resolver
    pub fn is_resolvable(&self) -> bool {
        matches!(self, HealthState::Healthy | HealthState::Degraded)
    }

    /// Position along the demotion path; larger is worse
    pub fn severity(&self) -> u8 {
        match self {
            HealthState::Registering => 0,
            HealthState::Healthy => 1,
            HealthState::Degraded => 2,
            HealthState::Unhealthy => 3,
            HealthState::Evicted => 4,
        }
    }

    /// The worse of two states
    pub fn worst(self, other: HealthState) -> HealthState {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthState {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "registering" => Ok(HealthState::Registering),
            "healthy" => Ok(HealthState::Healthy),
            "degraded" => Ok(HealthState::Degraded),
            "unhealthy" => Ok(HealthState::Unhealthy),
            "evicted" => Ok(HealthState::Evicted),
            other => Err(RegistryError::InvalidRecord(format!(
                "unknown health status '{}'",
                other
            ))),
        }
    }
}

/// A capability offered by an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDeclaration {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CapabilityDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeSet::new(),
            version: String::new(),
            description: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// One tag filter inside a dependency
///
/// `+tag` and a bare `tag` require the tag, `-tag` forbids it, and
/// `a|b` is an optional group that only adds to the match score.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TagExpr {
    Required(String),
    Excluded(String),
    AnyOf(Vec<String>),
}

impl FromStr for TagExpr {
    type Err = RegistryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let expr = raw.trim();
        let invalid = || RegistryError::InvalidRecord(format!("invalid tag expression '{}'", raw));

        if expr.contains('|') {
            let alternatives: Vec<String> = expr.split('|').map(|t| t.trim().to_string()).collect();
            if alternatives.iter().any(|t| t.is_empty()) {
                return Err(invalid());
            }
            return Ok(TagExpr::AnyOf(alternatives));
        }

        let (tag, excluded) = if let Some(rest) = expr.strip_prefix('-') {
            (rest.trim(), true)
        } else if let Some(rest) = expr.strip_prefix('+') {
            (rest.trim(), false)
        } else {
            (expr, false)
        };

        if tag.is_empty() {
            return Err(invalid());
        }
        if excluded {
            Ok(TagExpr::Excluded(tag.to_string()))
        } else {
            Ok(TagExpr::Required(tag.to_string()))
        }
    }
}

impl TryFrom<String> for TagExpr {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for TagExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagExpr::Required(tag) => write!(f, "+{}", tag),
            TagExpr::Excluded(tag) => write!(f, "-{}", tag),
            TagExpr::AnyOf(alternatives) => f.write_str(&alternatives.join("|")),
        }
    }
}

impl From<TagExpr> for String {
    fn from(expr: TagExpr) -> Self {
        expr.to_string()
    }
}

/// A capability an agent needs, with tag and version filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    pub capability: String,
    #[serde(default)]
    pub tags: Vec<TagExpr>,
    #[serde(default, alias = "version")]
    pub version_constraint: String,
}

impl DependencySpec {
    pub fn new(capability: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            tags: Vec::new(),
            version_constraint: String::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<TagExpr>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_version_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.version_constraint = constraint.into();
        self
    }
}

/// Complete agent information as persisted by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Caller-assigned unique key
    pub agent_id: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    /// Address other agents use to reach this one
    pub endpoint: String,
    #[serde(default)]
    pub capabilities: Vec<CapabilityDeclaration>,
    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,
    pub health: HealthState,
    pub last_heartbeat_at: DateTime<Utc>,
    pub registered_at: DateTime<Utc>,
    /// Per-agent override of the registry's degrade threshold, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_threshold_secs: Option<u64>,
    /// Per-agent override of the registry's eviction threshold, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eviction_threshold_secs: Option<u64>,
}

impl AgentRecord {
    /// Fresh record in the `Registering` state
    pub fn new(agent_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        let agent_id = agent_id.into();
        Self {
            name: agent_id.clone(),
            agent_id,
            version: String::new(),
            endpoint: String::new(),
            capabilities: Vec::new(),
            dependencies: Vec::new(),
            health: HealthState::Registering,
            last_heartbeat_at: now,
            registered_at: now,
            timeout_threshold_secs: None,
            eviction_threshold_secs: None,
        }
    }

    /// Record a heartbeat at `now` and move to `health`
    pub fn touch(&mut self, now: DateTime<Utc>, health: HealthState) {
        self.last_heartbeat_at = now;
        self.health = health;
    }

    /// Time since the last heartbeat, zero if the clock went backwards
    pub fn silence(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.last_heartbeat_at).to_std().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_expr_parsing() {
        assert_eq!("+claude".parse::<TagExpr>().unwrap(), TagExpr::Required("claude".into()));
        assert_eq!("claude".parse::<TagExpr>().unwrap(), TagExpr::Required("claude".into()));
        assert_eq!(
            "-deprecated".parse::<TagExpr>().unwrap(),
            TagExpr::Excluded("deprecated".into())
        );
        assert_eq!(
            "claude|gpt".parse::<TagExpr>().unwrap(),
            TagExpr::AnyOf(vec!["claude".into(), "gpt".into()])
        );
    }

    #[test]
    fn test_tag_expr_rejects_empty_parts() {
        assert!("".parse::<TagExpr>().is_err());
        assert!("+".parse::<TagExpr>().is_err());
        assert!("-  ".parse::<TagExpr>().is_err());
        assert!("a||b".parse::<TagExpr>().is_err());
        assert!("a|".parse::<TagExpr>().is_err());
    }

    #[test]
    fn test_dependency_spec_json_shape() {
        let spec: DependencySpec = serde_json::from_str(
            r#"{"capability":"chat","tags":["+claude","-deprecated","fast|cheap"],"version":">=1.0"}"#,
        )
        .unwrap();
        assert_eq!(spec.version_constraint, ">=1.0");
        assert_eq!(spec.tags.len(), 3);

        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["tags"][0], "+claude");
        assert_eq!(json["tags"][2], "fast|cheap");
    }

    #[test]
    fn test_bad_tag_in_json_is_rejected() {
        let result: Result<DependencySpec, _> =
            serde_json::from_str(r#"{"capability":"chat","tags":["-"]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_health_worst() {
        assert_eq!(HealthState::Healthy.worst(HealthState::Degraded), HealthState::Degraded);
        assert_eq!(HealthState::Unhealthy.worst(HealthState::Healthy), HealthState::Unhealthy);
        assert!(HealthState::Degraded.is_resolvable());
        assert!(!HealthState::Unhealthy.is_resolvable());
        assert!(!HealthState::Registering.is_resolvable());
    }

    #[test]
    fn test_silence_never_negative() {
        let now = Utc::now();
        let mut record = AgentRecord::new("a", now);
        record.last_heartbeat_at = now + chrono::Duration::seconds(5);
        assert_eq!(record.silence(now), std::time::Duration::ZERO);
    }
}
