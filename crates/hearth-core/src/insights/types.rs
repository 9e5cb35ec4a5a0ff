//! Core types for insights

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Categories of insights that can be generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    /// A recurring pattern or correlation that can become an automation
    Automation,
    /// An opportunity to reduce energy use
    Energy,
    /// A comfort improvement (climate, environment)
    Comfort,
    /// A convenience shortcut between related entities
    Convenience,
    /// A security-relevant relationship or pattern
    Security,
}

impl InsightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightKind::Automation => "automation",
            InsightKind::Energy => "energy",
            InsightKind::Comfort => "comfort",
            InsightKind::Convenience => "convenience",
            InsightKind::Security => "security",
        }
    }

    pub fn all() -> [InsightKind; 5] {
        [
            InsightKind::Automation,
            InsightKind::Energy,
            InsightKind::Comfort,
            InsightKind::Convenience,
            InsightKind::Security,
        ]
    }
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InsightKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "automation" => Ok(InsightKind::Automation),
            "energy" => Ok(InsightKind::Energy),
            "comfort" => Ok(InsightKind::Comfort),
            "convenience" => Ok(InsightKind::Convenience),
            "security" => Ok(InsightKind::Security),
            _ => Err(format!("Unknown insight kind: {}", s)),
        }
    }
}

/// Lifecycle status of an insight
///
/// Transitions: `active ⇄ dismissed`, `active → implemented` (terminal).
/// `dismissed → active` happens only through rediscovery with a confidence
/// gain above the reactivation margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightStatus {
    /// Currently active and surfaced to the host
    Active,
    /// User dismissed this insight
    Dismissed,
    /// User implemented the suggestion; retained as a record
    Implemented,
}

impl InsightStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightStatus::Active => "active",
            InsightStatus::Dismissed => "dismissed",
            InsightStatus::Implemented => "implemented",
        }
    }
}

impl fmt::Display for InsightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InsightStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(InsightStatus::Active),
            "dismissed" => Ok(InsightStatus::Dismissed),
            "implemented" => Ok(InsightStatus::Implemented),
            _ => Err(format!("Unknown insight status: {}", s)),
        }
    }
}

/// Compute the deterministic insight id.
///
/// Persisted-state contract: the id is the first 16 hex characters of the
/// SHA-256 digest of `"{kind}|{sorted entity ids joined by ','}|{signature}"`.
/// Re-detection of the same pattern therefore updates the existing record
/// instead of duplicating it, across restarts and across implementations.
pub fn deterministic_id(kind: InsightKind, entities: &[&str], signature: &str) -> String {
    let mut sorted: Vec<&str> = entities.to_vec();
    sorted.sort_unstable();

    let canonical = format!("{}|{}|{}", kind.as_str(), sorted.join(","), signature);
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// An insight produced by the synthesizer, before persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightDraft {
    /// Deterministic id (see `deterministic_id`)
    pub id: String,
    pub kind: InsightKind,
    /// Short title (e.g., "Schedule for light.kitchen")
    pub title: String,
    /// One-line human-readable explanation of the evidence
    pub description: String,
    /// Confidence in [0, 1], recomputed from evidence each scan
    pub confidence: f64,
    /// The entity the suggestion acts on
    pub primary_entity: String,
    /// Other involved entities (e.g., the correlation trigger)
    pub related_entities: Vec<String>,
    /// Ordered natural-language action suggestions
    pub suggestions: Vec<String>,
    /// Optional rendered automation definition
    pub yaml: Option<String>,
    /// When this draft was produced
    pub detected_at: DateTime<Utc>,
}

impl InsightDraft {
    /// Create a new draft with the id derived from its canonical tuple.
    pub fn new(
        kind: InsightKind,
        signature: &str,
        primary_entity: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        confidence: f64,
    ) -> Self {
        let primary_entity = primary_entity.into();
        let id = deterministic_id(kind, &[primary_entity.as_str()], signature);
        Self {
            id,
            kind,
            title: title.into(),
            description: description.into(),
            confidence: confidence.clamp(0.0, 1.0),
            primary_entity,
            related_entities: Vec::new(),
            suggestions: Vec::new(),
            yaml: None,
            detected_at: Utc::now(),
        }
    }

    /// Add a related entity and fold it into the id.
    pub fn with_related(mut self, entity: impl Into<String>, signature: &str) -> Self {
        let entity = entity.into();
        let mut ids: Vec<&str> = vec![self.primary_entity.as_str(), entity.as_str()];
        ids.sort_unstable();
        self.id = deterministic_id(self.kind, &ids, signature);
        self.related_entities.push(entity);
        self
    }

    /// Append a suggestion line.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Attach a rendered automation definition.
    pub fn with_yaml(mut self, yaml: impl Into<String>) -> Self {
        self.yaml = Some(yaml.into());
        self
    }
}

/// A persisted insight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub id: String,
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub confidence: f64,
    pub primary_entity: String,
    pub related_entities: Vec<String>,
    pub suggestions: Vec<String>,
    pub yaml: Option<String>,
    pub status: InsightStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate counts over the insight store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightSummary {
    pub total: i64,
    pub active: i64,
    pub dismissed: i64,
    pub implemented: i64,
    /// Counts per insight kind (all statuses)
    pub by_kind: std::collections::BTreeMap<String, i64>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serialization() {
        assert_eq!(InsightKind::Automation.as_str(), "automation");
        assert_eq!(
            InsightKind::from_str("security").unwrap(),
            InsightKind::Security
        );
        assert!(InsightKind::from_str("bogus").is_err());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            InsightStatus::Active,
            InsightStatus::Dismissed,
            InsightStatus::Implemented,
        ] {
            assert_eq!(InsightStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_deterministic_id_stable() {
        let a = deterministic_id(InsightKind::Automation, &["light.kitchen"], "time:31:6-8");
        let b = deterministic_id(InsightKind::Automation, &["light.kitchen"], "time:31:6-8");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_deterministic_id_entity_order_invariant() {
        let a = deterministic_id(
            InsightKind::Convenience,
            &["light.hallway", "binary_sensor.front_door"],
            "corr",
        );
        let b = deterministic_id(
            InsightKind::Convenience,
            &["binary_sensor.front_door", "light.hallway"],
            "corr",
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_deterministic_id_varies_with_signature() {
        let a = deterministic_id(InsightKind::Automation, &["light.kitchen"], "time:31:6-8");
        let b = deterministic_id(InsightKind::Automation, &["light.kitchen"], "time:31:18-20");
        assert_ne!(a, b);
    }

    #[test]
    fn test_draft_builder() {
        let draft = InsightDraft::new(
            InsightKind::Automation,
            "time:31:6-8",
            "light.kitchen",
            "Schedule for light.kitchen",
            "Turns on weekday mornings",
            1.2,
        )
        .with_suggestion("Create a schedule");

        assert_eq!(draft.confidence, 1.0); // clamped
        assert_eq!(draft.suggestions.len(), 1);
        assert!(draft.yaml.is_none());
    }

    #[test]
    fn test_draft_with_related_changes_id() {
        let base = InsightDraft::new(
            InsightKind::Convenience,
            "corr:short",
            "light.hallway",
            "t",
            "d",
            0.9,
        );
        let with_related = base
            .clone()
            .with_related("binary_sensor.front_door", "corr:short");
        assert_ne!(base.id, with_related.id);
        assert_eq!(with_related.related_entities.len(), 1);
    }
}
