//! Automation YAML rendering
//!
//! Best-effort rendering of host-platform automation definitions for
//! automation and convenience insights. The YAML is advisory: insights always
//! carry plain-language suggestions as the fallback.

use serde_json::{json, Value};

use crate::detect::DaySet;
use crate::error::Result;
use crate::profile::DAYS_PER_WEEK;

/// Weekday keys in host automation conditions.
const WEEKDAY_KEYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

/// Render a time-triggered automation for a recurring window.
pub fn render_time_automation(entity_id: &str, domain: &str, days: DaySet, start_hour: u8) -> Result<String> {
    let mut definition = json!({
        "alias": format!("Scheduled control for {}", entity_id),
        "description": format!("Automatically control {} at its usual time", entity_id),
        "trigger": [{
            "platform": "time",
            "at": format!("{:02}:00:00", start_hour),
        }],
        "action": [service_call(entity_id, domain)],
    });

    if days != crate::detect::time_patterns::EVERY_DAY {
        let weekdays: Vec<&str> = (0..DAYS_PER_WEEK)
            .filter(|d| days.contains(*d))
            .map(|d| WEEKDAY_KEYS[d])
            .collect();
        definition["condition"] = json!([{
            "condition": "time",
            "weekday": weekdays,
        }]);
    }

    to_yaml(entity_id, &definition)
}

/// Render a state-triggered automation for a correlated pair.
///
/// The trigger is a state trigger on the trigger entity; the action is a
/// service call inferred from the response entity's domain. Motion-style
/// triggers get the usual delay-then-off tail.
pub fn render_state_automation(
    trigger_entity: &str,
    trigger_domain: &str,
    trigger_device_class: Option<&str>,
    response_entity: &str,
    response_domain: &str,
) -> Result<String> {
    let mut trigger = json!({
        "platform": "state",
        "entity_id": trigger_entity,
    });
    match trigger_domain {
        "binary_sensor" => {
            trigger["to"] = json!("on");
        }
        "person" | "device_tracker" => {
            trigger["to"] = json!("home");
        }
        _ => {}
    }

    let mut actions = vec![service_call(response_entity, response_domain)];
    let motion_like = matches!(
        trigger_device_class,
        Some("motion") | Some("occupancy") | Some("presence")
    );
    if motion_like && matches!(response_domain, "light" | "switch" | "fan") {
        actions.push(json!({"delay": {"minutes": 5}}));
        actions.push(json!({
            "condition": "state",
            "entity_id": trigger_entity,
            "state": "off",
        }));
        actions.push(json!({
            "service": format!("{}.turn_off", response_domain),
            "target": {"entity_id": response_entity},
        }));
    }

    let definition = json!({
        "alias": format!("Control {} based on {}", response_entity, trigger_entity),
        "description": format!(
            "Automatically control {} when {} changes state",
            response_entity, trigger_entity
        ),
        "trigger": [trigger],
        "action": actions,
    });

    to_yaml(response_entity, &definition)
}

/// The service call a domain responds to, with sensible defaults.
fn service_call(entity_id: &str, domain: &str) -> Value {
    match domain {
        "light" => json!({
            "service": "light.turn_on",
            "target": {"entity_id": entity_id},
            "data": {"brightness_pct": 80},
        }),
        "climate" => json!({
            "service": "climate.set_temperature",
            "target": {"entity_id": entity_id},
            "data": {"temperature": 21},
        }),
        "cover" => json!({
            "service": "cover.open_cover",
            "target": {"entity_id": entity_id},
        }),
        "lock" => json!({
            "service": "lock.lock",
            "target": {"entity_id": entity_id},
        }),
        _ => json!({
            "service": format!("{}.turn_on", domain),
            "target": {"entity_id": entity_id},
        }),
    }
}

fn to_yaml(entity_id: &str, definition: &Value) -> Result<String> {
    let rendered = serde_yaml::to_string(definition)?;
    Ok(format!("# Suggested automation for {}\n{}", entity_id, rendered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::time_patterns::{EVERY_DAY, WEEKDAYS};

    #[test]
    fn test_time_automation_weekdays() {
        let yaml = render_time_automation("light.kitchen", "light", WEEKDAYS, 7).unwrap();

        assert!(yaml.starts_with("# Suggested automation for light.kitchen"));
        assert!(yaml.contains("platform: time"));
        assert!(yaml.contains("at: 07:00:00") || yaml.contains("at: '07:00:00'"));
        assert!(yaml.contains("light.turn_on"));
        assert!(yaml.contains("brightness_pct: 80"));
        assert!(yaml.contains("weekday"));
        assert!(yaml.contains("mon"));
        assert!(!yaml.contains("sat"));
    }

    #[test]
    fn test_time_automation_every_day_has_no_condition() {
        let yaml = render_time_automation("cover.bedroom", "cover", EVERY_DAY, 8).unwrap();
        assert!(yaml.contains("cover.open_cover"));
        assert!(!yaml.contains("weekday"));
    }

    #[test]
    fn test_state_automation_motion_tail() {
        let yaml = render_state_automation(
            "binary_sensor.hall_motion",
            "binary_sensor",
            Some("motion"),
            "light.hallway",
            "light",
        )
        .unwrap();

        assert!(yaml.contains("platform: state"));
        assert!(yaml.contains("to: on") || yaml.contains("to: 'on'"));
        assert!(yaml.contains("light.turn_on"));
        assert!(yaml.contains("delay"));
        assert!(yaml.contains("light.turn_off"));
    }

    #[test]
    fn test_state_automation_door_no_tail() {
        let yaml = render_state_automation(
            "binary_sensor.front_door",
            "binary_sensor",
            Some("door"),
            "light.hallway",
            "light",
        )
        .unwrap();

        assert!(yaml.contains("light.turn_on"));
        assert!(!yaml.contains("turn_off"));
    }

    #[test]
    fn test_state_automation_presence_trigger() {
        let yaml = render_state_automation(
            "person.alex",
            "person",
            None,
            "climate.living_room",
            "climate",
        )
        .unwrap();

        assert!(yaml.contains("to: home"));
        assert!(yaml.contains("climate.set_temperature"));
    }
}
