//! Pattern and correlation detectors
//!
//! Each detector consumes the scan's event snapshot and produces candidates
//! for the synthesizer. Detectors run independently: a failure in one is
//! logged and isolated, never fatal to the scan.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::warn;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::models::StateEvent;

pub mod correlations;
pub mod time_patterns;

pub use correlations::{CorrelationCandidate, CorrelationDetector, LagBucket};
pub use time_patterns::{DaySet, PatternCandidate, TimePatternDetector};

/// Snapshot handed to each detector for one scan.
pub struct DetectorInput<'a> {
    /// Events grouped per entity, time-ascending within each entity.
    pub events_by_entity: &'a BTreeMap<String, Vec<StateEvent>>,
    pub config: &'a EngineConfig,
    /// Analysis window: (lookback start, scan snapshot time).
    pub window: (DateTime<Utc>, DateTime<Utc>),
}

/// A raw finding from one detector, prior to synthesis.
#[derive(Debug, Clone)]
pub enum Candidate {
    Pattern(PatternCandidate),
    Correlation(CorrelationCandidate),
}

/// A detector over the scan snapshot.
pub trait Detector: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &'static str;

    /// Produce candidates from the snapshot.
    fn detect(&self, input: &DetectorInput<'_>) -> Result<Vec<Candidate>>;
}

/// Run every detector, isolating failures.
pub fn run_detectors(detectors: &[Box<dyn Detector>], input: &DetectorInput<'_>) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for detector in detectors {
        match detector.detect(input) {
            Ok(found) => {
                tracing::debug!(
                    detector = detector.name(),
                    count = found.len(),
                    "Detection complete"
                );
                candidates.extend(found);
            }
            Err(e) => {
                warn!(detector = detector.name(), error = %e, "Detector failed");
            }
        }
    }
    candidates
}

/// Group a flat, time-ascending event list by entity, preserving order.
pub fn group_by_entity(events: Vec<StateEvent>) -> BTreeMap<String, Vec<StateEvent>> {
    let mut grouped: BTreeMap<String, Vec<StateEvent>> = BTreeMap::new();
    for event in events {
        grouped.entry(event.entity_id.clone()).or_default().push(event);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::StateValue;

    struct FailingDetector;
    impl Detector for FailingDetector {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn detect(&self, _input: &DetectorInput<'_>) -> Result<Vec<Candidate>> {
            Err(Error::Ingest("boom".into()))
        }
    }

    struct EmptyDetector;
    impl Detector for EmptyDetector {
        fn name(&self) -> &'static str {
            "empty"
        }
        fn detect(&self, _input: &DetectorInput<'_>) -> Result<Vec<Candidate>> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_detector_failure_is_isolated() {
        let events = BTreeMap::new();
        let config = EngineConfig::default();
        let now = Utc::now();
        let input = DetectorInput {
            events_by_entity: &events,
            config: &config,
            window: (now - chrono::Duration::days(28), now),
        };

        let detectors: Vec<Box<dyn Detector>> =
            vec![Box::new(FailingDetector), Box::new(EmptyDetector)];
        let candidates = run_detectors(&detectors, &input);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_group_by_entity_preserves_order() {
        let now = Utc::now();
        let events = vec![
            StateEvent {
                entity_id: "light.a".into(),
                old_value: StateValue::Bool(false),
                new_value: StateValue::Bool(true),
                timestamp: now - chrono::Duration::minutes(10),
            },
            StateEvent {
                entity_id: "light.b".into(),
                old_value: StateValue::Bool(false),
                new_value: StateValue::Bool(true),
                timestamp: now - chrono::Duration::minutes(5),
            },
            StateEvent {
                entity_id: "light.a".into(),
                old_value: StateValue::Bool(true),
                new_value: StateValue::Bool(false),
                timestamp: now,
            },
        ];

        let grouped = group_by_entity(events);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["light.a"].len(), 2);
        assert!(grouped["light.a"][0].timestamp < grouped["light.a"][1].timestamp);
    }
}
