//! Recurring time-of-day / day-of-week pattern detection
//!
//! Transitions are bucketed into a 7×24 grid per entity. A bucket is active
//! when its count exceeds the entity's mean bucket density scaled by the
//! configured density factor, so the threshold follows total entity activity
//! rather than a fixed per-bucket constant. Contiguous active hours merge
//! into windows; identical windows across days merge into one candidate with
//! a day set. Confidence is observed occurrences over eligible calendar
//! instances of the window in the lookback period.

use chrono::{DateTime, Datelike, Timelike, Utc};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use super::{Candidate, Detector, DetectorInput};
use crate::error::Result;
use crate::models::StateEvent;
use crate::profile::{EntityWindowProfile, DAYS_PER_WEEK, HOURS_PER_DAY};

/// A bucket needs at least this many transitions to count as active,
/// whatever the density threshold says. Filters one-off spikes on
/// low-traffic entities.
const MIN_BUCKET_COUNT: u32 = 2;

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Set of days of the week, Monday = bit 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DaySet(pub u8);

pub const WEEKDAYS: DaySet = DaySet(0b0001_1111);
pub const WEEKEND: DaySet = DaySet(0b0110_0000);
pub const EVERY_DAY: DaySet = DaySet(0b0111_1111);

impl DaySet {
    pub fn empty() -> Self {
        DaySet(0)
    }

    pub fn with_day(self, day: usize) -> Self {
        DaySet(self.0 | (1 << day))
    }

    pub fn contains(self, day: usize) -> bool {
        self.0 & (1 << day) != 0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Readable label: "weekdays", "weekends", "every day", or named days.
    pub fn label(self) -> String {
        match self {
            EVERY_DAY => "every day".to_string(),
            WEEKDAYS => "weekdays".to_string(),
            WEEKEND => "weekends".to_string(),
            _ => {
                let names: Vec<&str> = (0..DAYS_PER_WEEK)
                    .filter(|d| self.contains(*d))
                    .map(|d| DAY_NAMES[d])
                    .collect();
                names.join(", ")
            }
        }
    }
}

/// A recurring activity window for a single entity.
#[derive(Debug, Clone)]
pub struct PatternCandidate {
    pub entity_id: String,
    pub days: DaySet,
    /// Window start hour (inclusive).
    pub start_hour: u8,
    /// Window end hour (exclusive).
    pub end_hour: u8,
    /// Distinct dates with at least one transition inside the window.
    pub occurrences: u32,
    /// Calendar instances of the window inside the lookback period.
    pub eligible: u32,
    /// occurrences / eligible, clipped to [0, 1].
    pub confidence: f64,
    /// Total transitions of the entity in the lookback window.
    pub total_changes: u32,
}

impl PatternCandidate {
    /// Stable signature for the deterministic insight id.
    pub fn signature(&self) -> String {
        format!("time:{:02x}:{}-{}", self.days.0, self.start_hour, self.end_hour)
    }

    /// Readable window label, e.g. "weekdays 06:00–08:00".
    pub fn window_label(&self) -> String {
        format!(
            "{} {:02}:00–{:02}:00",
            self.days.label(),
            self.start_hour,
            self.end_hour
        )
    }

    /// Window length in hours.
    pub fn span_hours(&self) -> u8 {
        self.end_hour - self.start_hour
    }
}

/// Detector for recurring time windows.
pub struct TimePatternDetector;

impl Detector for TimePatternDetector {
    fn name(&self) -> &'static str {
        "time_patterns"
    }

    fn detect(&self, input: &DetectorInput<'_>) -> Result<Vec<Candidate>> {
        let mut candidates = Vec::new();

        for (entity_id, events) in input.events_by_entity {
            // Per-entity isolation: one entity's bad history never aborts
            // the rest of the sweep.
            match detect_entity_patterns(entity_id, events, input) {
                Ok(found) => candidates.extend(found.into_iter().map(Candidate::Pattern)),
                Err(e) => {
                    warn!(entity = %entity_id, error = %e, "Skipping entity in pattern sweep");
                }
            }
        }

        Ok(candidates)
    }
}

fn detect_entity_patterns(
    entity_id: &str,
    events: &[StateEvent],
    input: &DetectorInput<'_>,
) -> Result<Vec<PatternCandidate>> {
    let profile = EntityWindowProfile::from_events(entity_id, events);

    // Noise floor: entities below min_state_changes produce no candidates.
    if profile.total < input.config.min_state_changes {
        return Ok(Vec::new());
    }

    let threshold = profile.mean_bucket_density() * input.config.density_factor;

    // Merge contiguous active hours per day into runs.
    let mut windows: BTreeMap<(u8, u8), DaySet> = BTreeMap::new();
    for day in 0..DAYS_PER_WEEK {
        let mut run_start: Option<usize> = None;
        for hour in 0..=HOURS_PER_DAY {
            let active = hour < HOURS_PER_DAY
                && profile.counts[day][hour] >= MIN_BUCKET_COUNT
                && profile.counts[day][hour] as f64 > threshold;
            match (active, run_start) {
                (true, None) => run_start = Some(hour),
                (false, Some(start)) => {
                    let entry = windows
                        .entry((start as u8, hour as u8))
                        .or_insert_with(DaySet::empty);
                    *entry = entry.with_day(day);
                    run_start = None;
                }
                _ => {}
            }
        }
    }

    let mut candidates = Vec::new();
    for ((start_hour, end_hour), days) in windows {
        let (occurrences, eligible) =
            count_window_instances(events, days, start_hour, end_hour, input.window);
        if eligible == 0 {
            continue;
        }

        let confidence = (occurrences as f64 / eligible as f64).clamp(0.0, 1.0);
        debug!(
            entity = entity_id,
            window = %format!("{} {}-{}", days.label(), start_hour, end_hour),
            occurrences,
            eligible,
            confidence,
            "Time pattern candidate"
        );

        candidates.push(PatternCandidate {
            entity_id: entity_id.to_string(),
            days,
            start_hour,
            end_hour,
            occurrences,
            eligible,
            confidence,
            total_changes: profile.total,
        });
    }

    Ok(candidates)
}

/// Count distinct dates with window activity, and the calendar instances of
/// the window inside the lookback period.
fn count_window_instances(
    events: &[StateEvent],
    days: DaySet,
    start_hour: u8,
    end_hour: u8,
    window: (DateTime<Utc>, DateTime<Utc>),
) -> (u32, u32) {
    let mut observed: HashSet<chrono::NaiveDate> = HashSet::new();
    for event in events {
        let day = event.timestamp.weekday().num_days_from_monday() as usize;
        let hour = event.timestamp.hour() as u8;
        if days.contains(day) && hour >= start_hour && hour < end_hour {
            observed.insert(event.timestamp.date_naive());
        }
    }

    let mut eligible = 0u32;
    let mut date = window.0.date_naive();
    let last = window.1.date_naive();
    while date <= last {
        if days.contains(date.weekday().num_days_from_monday() as usize) {
            eligible += 1;
        }
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    (observed.len() as u32, eligible)
}
