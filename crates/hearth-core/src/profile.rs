//! Per-entity activity profiles
//!
//! An `EntityWindowProfile` buckets an entity's transitions into a
//! day-of-week × hour-of-day grid. Profiles are recomputed from the event
//! store on every scan and never persisted.

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::models::StateEvent;

pub const DAYS_PER_WEEK: usize = 7;
pub const HOURS_PER_DAY: usize = 24;
pub const GRID_BUCKETS: usize = DAYS_PER_WEEK * HOURS_PER_DAY;

/// Histogram of one entity's transitions over the analysis window.
#[derive(Debug, Clone)]
pub struct EntityWindowProfile {
    pub entity_id: String,
    /// Transition counts indexed by [day-of-week (Monday = 0)][hour-of-day].
    pub counts: [[u32; HOURS_PER_DAY]; DAYS_PER_WEEK],
    pub total: u32,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl EntityWindowProfile {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            counts: [[0; HOURS_PER_DAY]; DAYS_PER_WEEK],
            total: 0,
            first_seen: None,
            last_seen: None,
        }
    }

    /// Build a profile from an entity's events (assumed time-ascending).
    pub fn from_events(entity_id: &str, events: &[StateEvent]) -> Self {
        let mut profile = Self::new(entity_id);
        for event in events {
            profile.observe(event.timestamp);
        }
        profile
    }

    /// Fold one transition timestamp into the grid.
    pub fn observe(&mut self, at: DateTime<Utc>) {
        let day = at.weekday().num_days_from_monday() as usize;
        let hour = at.hour() as usize;
        if day < DAYS_PER_WEEK && hour < HOURS_PER_DAY {
            self.counts[day][hour] += 1;
            self.total += 1;
            if self.first_seen.map_or(true, |first| at < first) {
                self.first_seen = Some(at);
            }
            if self.last_seen.map_or(true, |last| at > last) {
                self.last_seen = Some(at);
            }
        }
    }

    /// Mean transitions per grid bucket.
    pub fn mean_bucket_density(&self) -> f64 {
        self.total as f64 / GRID_BUCKETS as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_profile_bucketing() {
        // 2026-03-02 is a Monday
        let monday_7am = Utc.with_ymd_and_hms(2026, 3, 2, 7, 15, 0).unwrap();
        let sunday_22 = Utc.with_ymd_and_hms(2026, 3, 1, 22, 0, 0).unwrap();

        let mut profile = EntityWindowProfile::new("light.kitchen");
        profile.observe(monday_7am);
        profile.observe(monday_7am);
        profile.observe(sunday_22);

        assert_eq!(profile.counts[0][7], 2);
        assert_eq!(profile.counts[6][22], 1);
        assert_eq!(profile.total, 3);
        assert_eq!(profile.first_seen, Some(sunday_22));
        assert_eq!(profile.last_seen, Some(monday_7am));
    }

    #[test]
    fn test_mean_density() {
        let mut profile = EntityWindowProfile::new("light.kitchen");
        let base = Utc.with_ymd_and_hms(2026, 3, 2, 7, 0, 0).unwrap();
        for _ in 0..168 {
            profile.observe(base);
        }
        assert!((profile.mean_bucket_density() - 1.0).abs() < 1e-9);
    }
}
