//! Candidate classification and insight synthesis
//!
//! Maps raw detector candidates to typed insight drafts using a static
//! domain table. The table (not runtime type inspection) decides which kind
//! an entity's pattern or a pair's correlation becomes; extend it by adding
//! rows.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::types::{InsightDraft, InsightKind};
use super::yaml::{render_state_automation, render_time_automation};
use crate::detect::{Candidate, CorrelationCandidate, PatternCandidate};
use crate::models::{entity_domain, EntityMeta};

/// Domains that accept service calls.
pub const CONTROLLABLE_DOMAINS: &[&str] = &[
    "light",
    "switch",
    "climate",
    "cover",
    "fan",
    "media_player",
    "lock",
];

/// Time-pattern classification table: domain → insight kind.
const TIME_PATTERN_KINDS: &[(&str, InsightKind)] = &[
    ("light", InsightKind::Automation),
    ("switch", InsightKind::Automation),
    ("cover", InsightKind::Automation),
    ("fan", InsightKind::Automation),
    ("climate", InsightKind::Comfort),
];

/// Domains whose sustained activity windows suggest energy waste.
pub const HIGH_DRAW_DOMAINS: &[&str] = &["switch", "water_heater", "fan"];

/// Activity windows at least this long on a high-draw domain become energy
/// insights instead of schedules.
const ENERGY_SPAN_HOURS: u8 = 3;

/// Domains acting as correlation triggers.
const SENSOR_TRIGGER_DOMAINS: &[&str] = &["binary_sensor", "sensor", "person", "device_tracker"];

/// Security-tagged domains. A correlation touching one of these becomes a
/// security insight; door/motion device classes alone do not (they are the
/// everyday automation triggers, see the design notes).
pub const SECURITY_DOMAINS: &[&str] = &["lock", "alarm_control_panel"];

/// Correlation responses that read as convenience rather than automation.
const CONVENIENCE_RESPONSE_DOMAINS: &[&str] = &["media_player", "cover", "fan"];

/// Trigger device classes that get the delay-then-off automation tail.
const DOOR_DEVICE_CLASSES: &[&str] = &["door", "window", "garage_door", "opening"];

/// Convert detector candidates into insight drafts, highest confidence
/// first. Drafts are de-duplicated by id within the batch.
pub fn synthesize(
    candidates: &[Candidate],
    metas: &HashMap<String, EntityMeta>,
    now: DateTime<Utc>,
) -> Vec<InsightDraft> {
    let mut drafts = Vec::new();

    for candidate in candidates {
        let draft = match candidate {
            Candidate::Pattern(pattern) => classify_pattern(pattern),
            Candidate::Correlation(correlation) => classify_correlation(correlation, metas),
        };
        if let Some(mut draft) = draft {
            draft.detected_at = now;
            drafts.push(draft);
        }
    }

    drafts.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Keep the highest-confidence draft per id
    let mut seen: HashSet<String> = HashSet::new();
    drafts.retain(|draft| seen.insert(draft.id.clone()));

    debug!(count = drafts.len(), "Synthesis produced drafts");
    drafts
}

fn classify_pattern(pattern: &PatternCandidate) -> Option<InsightDraft> {
    let domain = entity_domain(&pattern.entity_id)?;
    let kind = TIME_PATTERN_KINDS
        .iter()
        .find(|(d, _)| *d == domain)
        .map(|(_, kind)| *kind)?;

    let window = pattern.window_label();

    // Sustained windows on high-draw domains read as energy waste, not as
    // something to schedule.
    if HIGH_DRAW_DOMAINS.contains(&domain) && pattern.span_hours() >= ENERGY_SPAN_HOURS {
        return Some(
            InsightDraft::new(
                InsightKind::Energy,
                &pattern.signature(),
                pattern.entity_id.clone(),
                format!("Long running window for {}", pattern.entity_id),
                format!(
                    "{} is active {} ({} transitions in recent weeks)",
                    pattern.entity_id, window, pattern.total_changes
                ),
                pattern.confidence,
            )
            .with_suggestion(format!(
                "Check whether {} really needs to run for {} hours on {}",
                pattern.entity_id,
                pattern.span_hours(),
                pattern.days.label()
            ))
            .with_suggestion("Consider a timer or schedule to cut the tail of the window"),
        );
    }

    let mut draft = InsightDraft::new(
        kind,
        &pattern.signature(),
        pattern.entity_id.clone(),
        format!("Schedule for {}", pattern.entity_id),
        format!(
            "{} is regularly used {} ({} of {} occasions observed)",
            pattern.entity_id, window, pattern.occurrences, pattern.eligible
        ),
        pattern.confidence,
    )
    .with_suggestion(format!(
        "Create an automation that controls {} at {:02}:00 on {}",
        pattern.entity_id, pattern.start_hour, pattern.days.label()
    ));

    match render_time_automation(&pattern.entity_id, domain, pattern.days, pattern.start_hour) {
        Ok(yaml) => draft = draft.with_yaml(yaml),
        Err(e) => debug!(entity = %pattern.entity_id, error = %e, "YAML rendering skipped"),
    }

    Some(draft)
}

fn classify_correlation(
    correlation: &CorrelationCandidate,
    metas: &HashMap<String, EntityMeta>,
) -> Option<InsightDraft> {
    let trigger_domain = entity_domain(&correlation.trigger_entity)?;
    let response_domain = entity_domain(&correlation.response_entity)?;

    let trigger_device_class = metas
        .get(&correlation.trigger_entity)
        .and_then(|meta| meta.device_class.as_deref());

    let security_pair = SECURITY_DOMAINS.contains(&trigger_domain)
        || SECURITY_DOMAINS.contains(&response_domain);

    let kind = if security_pair {
        InsightKind::Security
    } else if SENSOR_TRIGGER_DOMAINS.contains(&trigger_domain)
        && CONTROLLABLE_DOMAINS.contains(&response_domain)
    {
        if CONVENIENCE_RESPONSE_DOMAINS.contains(&response_domain)
            || trigger_device_class
                .map(|dc| DOOR_DEVICE_CLASSES.contains(&dc))
                .unwrap_or(false)
        {
            InsightKind::Convenience
        } else {
            InsightKind::Automation
        }
    } else {
        // Pairs outside the table (controllable → controllable, sensor →
        // sensor) are not actionable; skip them.
        return None;
    };

    let signature = correlation.signature();
    let description = format!(
        "{} follows {} {} ({} of {} transitions, lift {:.1}x)",
        correlation.response_entity,
        correlation.trigger_entity,
        correlation.lag.label(),
        correlation.support,
        correlation.trigger_count,
        correlation.lift
    );

    let mut draft = InsightDraft::new(
        kind,
        &signature,
        correlation.response_entity.clone(),
        format!(
            "Link {} to {}",
            correlation.response_entity, correlation.trigger_entity
        ),
        description,
        correlation.confidence,
    )
    .with_related(correlation.trigger_entity.clone(), &signature);

    draft = match kind {
        InsightKind::Security => draft
            .with_suggestion(format!(
                "Review whether {} changing should be monitored alongside {}",
                correlation.trigger_entity, correlation.response_entity
            ))
            .with_suggestion("Consider a notification automation for unexpected activity"),
        _ => draft.with_suggestion(format!(
            "Create an automation that controls {} when {} changes",
            correlation.response_entity, correlation.trigger_entity
        )),
    };

    // YAML only where a direct service call applies
    if kind != InsightKind::Security {
        match render_state_automation(
            &correlation.trigger_entity,
            trigger_domain,
            trigger_device_class,
            &correlation.response_entity,
            response_domain,
        ) {
            Ok(yaml) => draft = draft.with_yaml(yaml),
            Err(e) => {
                debug!(
                    trigger = %correlation.trigger_entity,
                    error = %e,
                    "YAML rendering skipped"
                )
            }
        }
    }

    Some(draft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::time_patterns::WEEKDAYS;
    use crate::detect::LagBucket;

    fn pattern(entity: &str, start: u8, end: u8) -> PatternCandidate {
        PatternCandidate {
            entity_id: entity.to_string(),
            days: WEEKDAYS,
            start_hour: start,
            end_hour: end,
            occurrences: 19,
            eligible: 20,
            confidence: 0.95,
            total_changes: 120,
        }
    }

    fn correlation(trigger: &str, response: &str) -> CorrelationCandidate {
        CorrelationCandidate {
            trigger_entity: trigger.to_string(),
            response_entity: response.to_string(),
            lag: LagBucket::Short,
            support: 40,
            trigger_count: 45,
            confidence: 40.0 / 45.0,
            lift: 200.0,
        }
    }

    fn meta(entity: &str, device_class: Option<&str>) -> EntityMeta {
        let mut meta = EntityMeta::from_entity_id(entity, Utc::now()).unwrap();
        meta.device_class = device_class.map(|s| s.to_string());
        meta
    }

    fn metas(entries: &[(&str, Option<&str>)]) -> HashMap<String, EntityMeta> {
        entries
            .iter()
            .map(|(entity, dc)| (entity.to_string(), meta(entity, *dc)))
            .collect()
    }

    #[test]
    fn test_light_pattern_becomes_automation_with_yaml() {
        let drafts = synthesize(
            &[Candidate::Pattern(pattern("light.kitchen", 6, 8))],
            &HashMap::new(),
            Utc::now(),
        );

        assert_eq!(drafts.len(), 1);
        let draft = &drafts[0];
        assert_eq!(draft.kind, InsightKind::Automation);
        assert_eq!(draft.primary_entity, "light.kitchen");
        assert!(draft.yaml.as_ref().unwrap().contains("light.turn_on"));
        assert!(!draft.suggestions.is_empty());
    }

    #[test]
    fn test_climate_pattern_becomes_comfort() {
        let drafts = synthesize(
            &[Candidate::Pattern(pattern("climate.living_room", 6, 8))],
            &HashMap::new(),
            Utc::now(),
        );
        assert_eq!(drafts[0].kind, InsightKind::Comfort);
        assert!(drafts[0]
            .yaml
            .as_ref()
            .unwrap()
            .contains("climate.set_temperature"));
    }

    #[test]
    fn test_long_switch_window_becomes_energy() {
        let drafts = synthesize(
            &[Candidate::Pattern(pattern("switch.space_heater", 18, 23))],
            &HashMap::new(),
            Utc::now(),
        );
        assert_eq!(drafts[0].kind, InsightKind::Energy);
        assert!(drafts[0].yaml.is_none());
        // Energy insights still carry actionable text
        assert!(drafts[0].suggestions.len() >= 2);
    }

    #[test]
    fn test_short_switch_window_stays_automation() {
        let drafts = synthesize(
            &[Candidate::Pattern(pattern("switch.coffee_maker", 6, 7))],
            &HashMap::new(),
            Utc::now(),
        );
        assert_eq!(drafts[0].kind, InsightKind::Automation);
    }

    #[test]
    fn test_sensor_pattern_produces_nothing() {
        let drafts = synthesize(
            &[Candidate::Pattern(pattern("sensor.outdoor_temp", 6, 8))],
            &HashMap::new(),
            Utc::now(),
        );
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_door_to_light_is_convenience() {
        let metas = metas(&[
            ("binary_sensor.front_door", Some("door")),
            ("light.hallway", None),
        ]);
        let drafts = synthesize(
            &[Candidate::Correlation(correlation(
                "binary_sensor.front_door",
                "light.hallway",
            ))],
            &metas,
            Utc::now(),
        );

        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].kind, InsightKind::Convenience);
        assert_eq!(drafts[0].primary_entity, "light.hallway");
        assert_eq!(drafts[0].related_entities, vec!["binary_sensor.front_door"]);
        assert!(drafts[0].yaml.as_ref().unwrap().contains("platform: state"));
    }

    #[test]
    fn test_motion_to_light_is_automation() {
        let metas = metas(&[("binary_sensor.hall_motion", Some("motion"))]);
        let drafts = synthesize(
            &[Candidate::Correlation(correlation(
                "binary_sensor.hall_motion",
                "light.hallway",
            ))],
            &metas,
            Utc::now(),
        );
        assert_eq!(drafts[0].kind, InsightKind::Automation);
        // Motion lighting gets the delay-then-off tail
        assert!(drafts[0].yaml.as_ref().unwrap().contains("turn_off"));
    }

    #[test]
    fn test_lock_response_is_security_without_yaml() {
        let metas = metas(&[("binary_sensor.front_door", Some("door"))]);
        let drafts = synthesize(
            &[Candidate::Correlation(correlation(
                "binary_sensor.front_door",
                "lock.front_door",
            ))],
            &metas,
            Utc::now(),
        );
        assert_eq!(drafts[0].kind, InsightKind::Security);
        assert!(drafts[0].yaml.is_none());
        assert!(!drafts[0].suggestions.is_empty());
    }

    #[test]
    fn test_untabled_pair_is_skipped() {
        let drafts = synthesize(
            &[Candidate::Correlation(correlation(
                "light.hallway",
                "light.kitchen",
            ))],
            &HashMap::new(),
            Utc::now(),
        );
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_batch_dedupe_keeps_highest_confidence() {
        let mut low = pattern("light.kitchen", 6, 8);
        low.confidence = 0.5;
        let high = pattern("light.kitchen", 6, 8);

        let drafts = synthesize(
            &[Candidate::Pattern(low), Candidate::Pattern(high)],
            &HashMap::new(),
            Utc::now(),
        );
        assert_eq!(drafts.len(), 1);
        assert!((drafts[0].confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_output_sorted_by_confidence() {
        let mut weak = pattern("light.porch", 20, 21);
        weak.confidence = 0.4;
        let drafts = synthesize(
            &[
                Candidate::Pattern(weak),
                Candidate::Pattern(pattern("light.kitchen", 6, 8)),
            ],
            &HashMap::new(),
            Utc::now(),
        );
        assert_eq!(drafts.len(), 2);
        assert!(drafts[0].confidence >= drafts[1].confidence);
    }
}
