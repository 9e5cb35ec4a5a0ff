//! Core data models: state events, typed state values, entity metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// A typed scalar state value.
///
/// Host platforms report entity states as strings; numeric and boolean-like
/// values are promoted to their typed form on ingestion so detectors can
/// reason about them without re-parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// State strings treated as the boolean "on" side of a transition.
const ON_STATES: &[&str] = &["on", "home", "open", "unlocked", "active", "playing"];

/// State strings treated as the boolean "off" side of a transition.
const OFF_STATES: &[&str] = &[
    "off", "away", "not_home", "closed", "locked", "inactive", "idle", "paused", "standby",
];

impl StateValue {
    /// Parse a wire-format state string into its typed form.
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_ascii_lowercase();
        if ON_STATES.contains(&lower.as_str()) {
            return StateValue::Bool(true);
        }
        if OFF_STATES.contains(&lower.as_str()) {
            return StateValue::Bool(false);
        }
        if let Ok(n) = raw.trim().parse::<f64>() {
            if n.is_finite() {
                return StateValue::Number(n);
            }
        }
        StateValue::Text(raw.trim().to_string())
    }

    /// Render back to the wire string form used for storage.
    pub fn as_wire(&self) -> String {
        match self {
            StateValue::Bool(true) => "on".to_string(),
            StateValue::Bool(false) => "off".to_string(),
            StateValue::Number(n) => {
                if n.fract() == 0.0 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            StateValue::Text(s) => s.clone(),
        }
    }

    /// Whether this value counts as the "on" side for activity detection.
    pub fn is_on(&self) -> bool {
        matches!(self, StateValue::Bool(true))
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

/// Immutable record of one entity state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateEvent {
    pub entity_id: String,
    pub old_value: StateValue,
    pub new_value: StateValue,
    pub timestamp: DateTime<Utc>,
}

impl StateEvent {
    /// Build an event from wire-format strings, validating the entity id.
    ///
    /// Returns `Error::Ingest` for events that cannot be attributed to a
    /// domain-qualified entity; callers drop and log these, never abort.
    pub fn from_wire(
        entity_id: &str,
        old_value: &str,
        new_value: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        if entity_domain(entity_id).is_none() {
            return Err(Error::Ingest(format!(
                "entity id {:?} is not domain-qualified",
                entity_id
            )));
        }
        Ok(Self {
            entity_id: entity_id.to_string(),
            old_value: StateValue::parse(old_value),
            new_value: StateValue::parse(new_value),
            timestamp,
        })
    }

    /// The domain portion of the entity id.
    pub fn domain(&self) -> &str {
        entity_domain(&self.entity_id).unwrap_or("")
    }
}

/// Extract the domain from a `domain.object_id` entity identifier.
pub fn entity_domain(entity_id: &str) -> Option<&str> {
    match entity_id.split_once('.') {
        Some((domain, object)) if !domain.is_empty() && !object.is_empty() => Some(domain),
        _ => None,
    }
}

/// Snapshot metadata for one entity, supplied by the host for classification.
///
/// The domain is always derivable from the entity id, so ingestion never
/// blocks on a missing snapshot; device_class and friendly_name refine
/// classification when the host provides them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMeta {
    pub entity_id: String,
    pub domain: String,
    pub device_class: Option<String>,
    pub friendly_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl EntityMeta {
    /// Minimal metadata derived from the entity id alone.
    pub fn from_entity_id(entity_id: &str, now: DateTime<Utc>) -> Option<Self> {
        let domain = entity_domain(entity_id)?;
        Some(Self {
            entity_id: entity_id.to_string(),
            domain: domain.to_string(),
            device_class: None,
            friendly_name: None,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_value_parse() {
        assert_eq!(StateValue::parse("on"), StateValue::Bool(true));
        assert_eq!(StateValue::parse("Home"), StateValue::Bool(true));
        assert_eq!(StateValue::parse("locked"), StateValue::Bool(false));
        assert_eq!(StateValue::parse("21.5"), StateValue::Number(21.5));
        assert_eq!(
            StateValue::parse("heat_cool"),
            StateValue::Text("heat_cool".to_string())
        );
    }

    #[test]
    fn test_state_value_wire_round_trip() {
        assert_eq!(StateValue::parse("on").as_wire(), "on");
        assert_eq!(StateValue::parse("off").as_wire(), "off");
        assert_eq!(StateValue::parse("42").as_wire(), "42");
        assert_eq!(StateValue::parse("playing").is_on(), true);
    }

    #[test]
    fn test_entity_domain() {
        assert_eq!(entity_domain("light.kitchen"), Some("light"));
        assert_eq!(entity_domain("binary_sensor.front_door"), Some("binary_sensor"));
        assert_eq!(entity_domain("no_domain"), None);
        assert_eq!(entity_domain(".kitchen"), None);
        assert_eq!(entity_domain("light."), None);
    }

    #[test]
    fn test_event_from_wire_rejects_malformed() {
        let err = StateEvent::from_wire("kitchen", "off", "on", Utc::now());
        assert!(matches!(err, Err(Error::Ingest(_))));

        let ok = StateEvent::from_wire("light.kitchen", "off", "on", Utc::now()).unwrap();
        assert_eq!(ok.domain(), "light");
        assert!(ok.new_value.is_on());
    }
}
