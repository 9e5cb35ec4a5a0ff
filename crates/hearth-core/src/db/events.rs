//! Event store operations
//!
//! Bounded, queryable history of entity state-change events. Writes filter
//! against the tracked-domain allow-list and the exclusion list; retention is
//! enforced lazily on the write path (every `EVICTION_STRIDE` writes) so
//! eviction stays amortized O(1) per write instead of rescanning.

use chrono::{DateTime, Duration, Utc};
use rusqlite::params;
use serde::Serialize;
use std::sync::atomic::Ordering;
use tracing::debug;

use super::{format_datetime, parse_datetime, Database};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::models::{StateEvent, StateValue};

/// How many accepted writes between lazy eviction sweeps.
const EVICTION_STRIDE: u64 = 64;

/// Outcome of one ingest attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Event stored.
    Recorded,
    /// Event was outside the tracked domains or explicitly excluded.
    Filtered,
}

/// Aggregate statistics over the retained event window.
#[derive(Debug, Clone, Serialize)]
pub struct EventStats {
    pub total_events: i64,
    pub tracked_entities: i64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

impl Database {
    /// Append a state-change event in arrival order.
    ///
    /// Events whose entity falls outside the configured tracked domains, or
    /// inside the excluded-entity list, are silently dropped (logged at debug
    /// level) and reported as `Filtered`.
    pub fn record_event(&self, event: &StateEvent, config: &EngineConfig) -> Result<IngestOutcome> {
        if !config.is_tracked(&event.entity_id) {
            debug!(entity = %event.entity_id, "Dropping event for untracked entity");
            return Ok(IngestOutcome::Filtered);
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO state_events (entity_id, old_value, new_value, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                event.entity_id,
                event.old_value.as_wire(),
                event.new_value.as_wire(),
                format_datetime(event.timestamp)
            ],
        )?;

        let writes = self.write_counter.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % EVICTION_STRIDE == 0 {
            self.evict_expired_events(&event.entity_id, config)?;
        }

        Ok(IngestOutcome::Recorded)
    }

    /// Drop events past the retention horizon, and enforce the per-entity
    /// capacity bound for the entity that triggered the sweep.
    fn evict_expired_events(&self, entity_id: &str, config: &EngineConfig) -> Result<()> {
        let conn = self.conn()?;
        let horizon = Utc::now() - Duration::days(config.retention_days);

        let aged_out = conn.execute(
            "DELETE FROM state_events WHERE recorded_at < ?1",
            params![format_datetime(horizon)],
        )?;

        let over_cap = conn.execute(
            "DELETE FROM state_events
             WHERE entity_id = ?1
               AND id NOT IN (
                   SELECT id FROM state_events
                   WHERE entity_id = ?1
                   ORDER BY recorded_at DESC, id DESC
                   LIMIT ?2
               )",
            params![entity_id, config.max_events_per_entity],
        )?;

        if aged_out > 0 || over_cap > 0 {
            debug!(aged_out, over_cap, entity = entity_id, "Evicted expired events");
        }

        Ok(())
    }

    /// Events for one entity (or all tracked entities) since a timestamp,
    /// ordered by timestamp ascending.
    pub fn events_since(
        &self,
        entity_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<StateEvent>> {
        let conn = self.conn()?;
        let since_str = format_datetime(since);

        let mut events = Vec::new();
        if let Some(entity) = entity_id {
            let mut stmt = conn.prepare(
                "SELECT entity_id, old_value, new_value, recorded_at
                 FROM state_events
                 WHERE entity_id = ?1 AND recorded_at >= ?2
                 ORDER BY recorded_at ASC, id ASC",
            )?;
            let rows = stmt.query_map(params![entity, since_str], row_to_event)?;
            for row in rows {
                events.push(row?);
            }
        } else {
            let mut stmt = conn.prepare(
                "SELECT entity_id, old_value, new_value, recorded_at
                 FROM state_events
                 WHERE recorded_at >= ?1
                 ORDER BY recorded_at ASC, id ASC",
            )?;
            let rows = stmt.query_map(params![since_str], row_to_event)?;
            for row in rows {
                events.push(row?);
            }
        }

        Ok(events)
    }

    /// Aggregate stats over the retained window, for the status surface.
    pub fn event_stats(&self) -> Result<EventStats> {
        let conn = self.conn()?;

        let (total_events, tracked_entities): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT entity_id) FROM state_events",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let (oldest, newest): (Option<String>, Option<String>) = conn.query_row(
            "SELECT MIN(recorded_at), MAX(recorded_at) FROM state_events",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(EventStats {
            total_events,
            tracked_entities,
            oldest: oldest.map(|s| parse_datetime(&s)),
            newest: newest.map(|s| parse_datetime(&s)),
        })
    }

    /// Count of retained events for one entity (used in tests and status).
    pub fn event_count(&self, entity_id: &str) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM state_events WHERE entity_id = ?1",
            params![entity_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<StateEvent> {
    let entity_id: String = row.get(0)?;
    let old_value: String = row.get(1)?;
    let new_value: String = row.get(2)?;
    let recorded_at: String = row.get(3)?;

    Ok(StateEvent {
        entity_id,
        old_value: StateValue::parse(&old_value),
        new_value: StateValue::parse(&new_value),
        timestamp: parse_datetime(&recorded_at),
    })
}
