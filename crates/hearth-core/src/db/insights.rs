//! Insight store and lifecycle operations
//!
//! The store is the only mutation path for insights. Synthesis output merges
//! through `upsert_from_synthesis`; user intent flows through
//! `dismiss_insight` / `implement_insight`; growth is bounded by
//! `purge_insights`.

use chrono::{Duration, Utc};
use rusqlite::params;
use serde::Serialize;
use tracing::debug;

use super::{format_datetime, parse_datetime, Database};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::insights::{Insight, InsightDraft, InsightKind, InsightStatus, InsightSummary};

/// Outcome counts of one synthesis merge.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SynthesisStats {
    /// New insights admitted as active
    pub inserted: usize,
    /// Existing active/implemented insights refreshed in place
    pub updated: usize,
    /// Dismissed insights reactivated by a confidence gain
    pub reactivated: usize,
    /// Dismissed insights left untouched (user intent respected)
    pub suppressed: usize,
    /// Candidates held back by the max_suggestions cap
    pub held_back: usize,
}

impl Database {
    /// Merge freshly synthesized drafts into the store.
    ///
    /// Drafts should arrive sorted by descending confidence; admission of new
    /// insights (and reactivations) stops once the active count reaches
    /// `max_suggestions`. Held-back candidates are not persisted; they will
    /// be re-synthesized on a future scan.
    ///
    /// Rediscovery replaces confidence with the latest evidence; it never
    /// averages. Implemented insights keep their status.
    pub fn upsert_from_synthesis(
        &self,
        drafts: &[InsightDraft],
        config: &EngineConfig,
    ) -> Result<SynthesisStats> {
        let mut stats = SynthesisStats::default();
        let mut active_count = self.count_active_insights()?;

        for draft in drafts {
            match self.get_insight(&draft.id)? {
                None => {
                    if (active_count as usize) < config.max_suggestions {
                        self.insert_draft(draft)?;
                        active_count += 1;
                        stats.inserted += 1;
                    } else {
                        stats.held_back += 1;
                    }
                }
                Some(existing) => match existing.status {
                    InsightStatus::Active | InsightStatus::Implemented => {
                        self.refresh_insight(draft)?;
                        stats.updated += 1;
                    }
                    InsightStatus::Dismissed => {
                        let gained = draft.confidence - existing.confidence;
                        if gained > config.reactivation_margin
                            && (active_count as usize) < config.max_suggestions
                        {
                            self.reactivate_insight(draft)?;
                            active_count += 1;
                            stats.reactivated += 1;
                        } else {
                            stats.suppressed += 1;
                        }
                    }
                },
            }
        }

        debug!(
            inserted = stats.inserted,
            updated = stats.updated,
            reactivated = stats.reactivated,
            suppressed = stats.suppressed,
            held_back = stats.held_back,
            "Synthesis merge complete"
        );

        Ok(stats)
    }

    fn insert_draft(&self, draft: &InsightDraft) -> Result<()> {
        let conn = self.conn()?;
        let now = format_datetime(draft.detected_at);
        conn.execute(
            "INSERT INTO insights (
                 id, kind, title, description, confidence, primary_entity,
                 related_entities, suggestions, yaml, status, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'active', ?10, ?10)",
            params![
                draft.id,
                draft.kind.as_str(),
                draft.title,
                draft.description,
                draft.confidence,
                draft.primary_entity,
                serde_json::to_string(&draft.related_entities)?,
                serde_json::to_string(&draft.suggestions)?,
                draft.yaml,
                now
            ],
        )?;
        Ok(())
    }

    /// Refresh evidence fields in place without touching status.
    fn refresh_insight(&self, draft: &InsightDraft) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE insights SET
                 title = ?2, description = ?3, confidence = ?4,
                 related_entities = ?5, suggestions = ?6, yaml = ?7, updated_at = ?8
             WHERE id = ?1",
            params![
                draft.id,
                draft.title,
                draft.description,
                draft.confidence,
                serde_json::to_string(&draft.related_entities)?,
                serde_json::to_string(&draft.suggestions)?,
                draft.yaml,
                format_datetime(draft.detected_at)
            ],
        )?;
        Ok(())
    }

    fn reactivate_insight(&self, draft: &InsightDraft) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE insights SET
                 status = 'active', title = ?2, description = ?3, confidence = ?4,
                 related_entities = ?5, suggestions = ?6, yaml = ?7, updated_at = ?8
             WHERE id = ?1",
            params![
                draft.id,
                draft.title,
                draft.description,
                draft.confidence,
                serde_json::to_string(&draft.related_entities)?,
                serde_json::to_string(&draft.suggestions)?,
                draft.yaml,
                format_datetime(draft.detected_at)
            ],
        )?;
        Ok(())
    }

    /// Dismiss an insight. Fails with `NotFound` for an unknown id and
    /// `Lifecycle` when the insight is already implemented (terminal).
    pub fn dismiss_insight(&self, id: &str) -> Result<()> {
        let existing = self
            .get_insight(id)?
            .ok_or_else(|| Error::NotFound(format!("insight {}", id)))?;

        if existing.status == InsightStatus::Implemented {
            return Err(Error::Lifecycle(format!(
                "insight {} is implemented and cannot be dismissed",
                id
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            "UPDATE insights SET status = 'dismissed', updated_at = ?2 WHERE id = ?1",
            params![id, format_datetime(Utc::now())],
        )?;
        Ok(())
    }

    /// Mark an insight as implemented (terminal). Fails with `NotFound` for
    /// an unknown id and `Lifecycle` unless the insight is active.
    pub fn implement_insight(&self, id: &str) -> Result<()> {
        let existing = self
            .get_insight(id)?
            .ok_or_else(|| Error::NotFound(format!("insight {}", id)))?;

        if existing.status != InsightStatus::Active {
            return Err(Error::Lifecycle(format!(
                "insight {} is {} and cannot be marked implemented",
                id, existing.status
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            "UPDATE insights SET status = 'implemented', updated_at = ?2 WHERE id = ?1",
            params![id, format_datetime(Utc::now())],
        )?;
        Ok(())
    }

    /// Remove dismissed and stale active insights older than the purge
    /// horizon. Implemented insights are retained indefinitely as a record of
    /// accepted changes.
    pub fn purge_insights(&self, purge_days: i64) -> Result<usize> {
        let conn = self.conn()?;
        let cutoff = Utc::now() - Duration::days(purge_days);
        let removed = conn.execute(
            "DELETE FROM insights
             WHERE status IN ('dismissed', 'active') AND updated_at < ?1",
            params![format_datetime(cutoff)],
        )?;
        if removed > 0 {
            debug!(removed, purge_days, "Purged old insights");
        }
        Ok(removed)
    }

    /// Fetch one insight by id.
    pub fn get_insight(&self, id: &str) -> Result<Option<Insight>> {
        let conn = self.conn()?;
        let result = conn.query_row(
            "SELECT id, kind, title, description, confidence, primary_entity,
                    related_entities, suggestions, yaml, status, created_at, updated_at
             FROM insights WHERE id = ?1",
            params![id],
            row_to_insight,
        );
        match result {
            Ok(insight) => Ok(Some(insight)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List insights with optional status and kind filters, highest
    /// confidence first.
    pub fn list_insights(
        &self,
        status: Option<InsightStatus>,
        kind: Option<InsightKind>,
    ) -> Result<Vec<Insight>> {
        let conn = self.conn()?;
        let mut sql = String::from(
            "SELECT id, kind, title, description, confidence, primary_entity,
                    related_entities, suggestions, yaml, status, created_at, updated_at
             FROM insights",
        );
        let mut clauses = Vec::new();
        let mut bound: Vec<String> = Vec::new();
        if let Some(s) = status {
            clauses.push("status = ?");
            bound.push(s.as_str().to_string());
        }
        if let Some(k) = kind {
            clauses.push("kind = ?");
            bound.push(k.as_str().to_string());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY confidence DESC, updated_at DESC");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(bound.iter()), row_to_insight)?;

        let mut insights = Vec::new();
        for row in rows {
            insights.push(row?);
        }
        Ok(insights)
    }

    /// Count active insights.
    pub fn count_active_insights(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM insights WHERE status = 'active'",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Recompute the aggregate summary on demand.
    pub fn insight_summary(&self) -> Result<InsightSummary> {
        let conn = self.conn()?;

        let (total, active, dismissed, implemented): (i64, i64, i64, i64) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(status = 'active'), 0),
                    COALESCE(SUM(status = 'dismissed'), 0),
                    COALESCE(SUM(status = 'implemented'), 0)
             FROM insights",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        let mut by_kind = std::collections::BTreeMap::new();
        for kind in InsightKind::all() {
            by_kind.insert(kind.as_str().to_string(), 0);
        }
        let mut stmt = conn.prepare("SELECT kind, COUNT(*) FROM insights GROUP BY kind")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (kind, count) = row?;
            by_kind.insert(kind, count);
        }

        let last_updated: Option<String> =
            conn.query_row("SELECT MAX(updated_at) FROM insights", [], |row| row.get(0))?;

        Ok(InsightSummary {
            total,
            active,
            dismissed,
            implemented,
            by_kind,
            last_updated: last_updated.map(|s| parse_datetime(&s)),
        })
    }
}

fn row_to_insight(row: &rusqlite::Row) -> rusqlite::Result<Insight> {
    let kind: String = row.get(1)?;
    let related: String = row.get(6)?;
    let suggestions: String = row.get(7)?;
    let status: String = row.get(9)?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;

    Ok(Insight {
        id: row.get(0)?,
        kind: kind.parse().unwrap_or(InsightKind::Automation),
        title: row.get(2)?,
        description: row.get(3)?,
        confidence: row.get(4)?,
        primary_entity: row.get(5)?,
        related_entities: serde_json::from_str(&related).unwrap_or_default(),
        suggestions: serde_json::from_str(&suggestions).unwrap_or_default(),
        yaml: row.get(8)?,
        status: status.parse().unwrap_or(InsightStatus::Active),
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(signature: &str, confidence: f64) -> InsightDraft {
        InsightDraft::new(
            InsightKind::Automation,
            signature,
            "light.kitchen",
            "Schedule for light.kitchen",
            "Turns on weekday mornings",
            confidence,
        )
        .with_suggestion("Create a schedule automation")
    }

    #[test]
    fn test_upsert_inserts_then_updates() {
        let db = Database::in_memory().unwrap();
        let config = EngineConfig::default();

        let first = db
            .upsert_from_synthesis(&[draft("time:31:6-8", 0.8)], &config)
            .unwrap();
        assert_eq!(first.inserted, 1);

        // Same pattern rediscovered: updated in place, no duplicate
        let second = db
            .upsert_from_synthesis(&[draft("time:31:6-8", 0.9)], &config)
            .unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.updated, 1);

        let all = db.list_insights(None, None).unwrap();
        assert_eq!(all.len(), 1);
        // Latest evidence wins, never averaged
        assert!((all[0].confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_dismissed_stays_dismissed_without_margin() {
        let db = Database::in_memory().unwrap();
        let config = EngineConfig::default();

        db.upsert_from_synthesis(&[draft("time:31:6-8", 0.8)], &config)
            .unwrap();
        let id = db.list_insights(None, None).unwrap()[0].id.clone();
        db.dismiss_insight(&id).unwrap();

        // Rediscovery with equal and slightly higher confidence: suppressed
        for confidence in [0.8, 0.8 + config.reactivation_margin] {
            let stats = db
                .upsert_from_synthesis(&[draft("time:31:6-8", confidence)], &config)
                .unwrap();
            assert_eq!(stats.suppressed, 1);
            assert_eq!(
                db.get_insight(&id).unwrap().unwrap().status,
                InsightStatus::Dismissed
            );
        }

        // Confidence gain beyond the margin reactivates
        let stats = db
            .upsert_from_synthesis(
                &[draft("time:31:6-8", 0.8 + config.reactivation_margin + 0.01)],
                &config,
            )
            .unwrap();
        assert_eq!(stats.reactivated, 1);
        assert_eq!(
            db.get_insight(&id).unwrap().unwrap().status,
            InsightStatus::Active
        );
    }

    #[test]
    fn test_implemented_is_terminal() {
        let db = Database::in_memory().unwrap();
        let config = EngineConfig::default();

        db.upsert_from_synthesis(&[draft("time:31:6-8", 0.8)], &config)
            .unwrap();
        let id = db.list_insights(None, None).unwrap()[0].id.clone();
        db.implement_insight(&id).unwrap();

        // Rediscovery refreshes evidence but never flips status
        db.upsert_from_synthesis(&[draft("time:31:6-8", 0.95)], &config)
            .unwrap();
        let insight = db.get_insight(&id).unwrap().unwrap();
        assert_eq!(insight.status, InsightStatus::Implemented);
        assert!((insight.confidence - 0.95).abs() < 1e-9);

        // Manual dismiss of an implemented insight is rejected
        assert!(matches!(db.dismiss_insight(&id), Err(Error::Lifecycle(_))));
    }

    #[test]
    fn test_lifecycle_not_found() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(
            db.dismiss_insight("missing"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            db.implement_insight("missing"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_max_suggestions_cap_holds_back_surplus() {
        let db = Database::in_memory().unwrap();
        let mut config = EngineConfig::default();
        config.max_suggestions = 2;

        let drafts: Vec<InsightDraft> = (0..5)
            .map(|i| draft(&format!("time:31:{}-{}", i, i + 1), 0.9 - i as f64 * 0.1))
            .collect();

        let stats = db.upsert_from_synthesis(&drafts, &config).unwrap();
        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.held_back, 3);
        assert_eq!(db.count_active_insights().unwrap(), 2);

        // The two admitted are the highest-confidence candidates
        let active = db.list_insights(Some(InsightStatus::Active), None).unwrap();
        assert!((active[0].confidence - 0.9).abs() < 1e-9);
        assert!((active[1].confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_purge_spares_implemented_and_fresh() {
        let db = Database::in_memory().unwrap();
        let config = EngineConfig::default();

        let old = Utc::now() - Duration::days(90);
        let mut stale_active = draft("time:31:6-8", 0.8);
        stale_active.detected_at = old;
        let mut stale_dismissed = draft("time:31:9-10", 0.7);
        stale_dismissed.detected_at = old;
        let mut stale_implemented = draft("time:31:11-12", 0.6);
        stale_implemented.detected_at = old;
        let fresh = draft("time:31:13-14", 0.5);

        db.upsert_from_synthesis(
            &[
                stale_active.clone(),
                stale_dismissed.clone(),
                stale_implemented.clone(),
                fresh.clone(),
            ],
            &config,
        )
        .unwrap();

        db.implement_insight(&stale_implemented.id).unwrap();
        db.dismiss_insight(&stale_dismissed.id).unwrap();
        // Backdate updated_at for the stale rows (implement/dismiss stamped now)
        let conn = db.conn().unwrap();
        for id in [&stale_active.id, &stale_dismissed.id, &stale_implemented.id] {
            conn.execute(
                "UPDATE insights SET updated_at = ?2 WHERE id = ?1",
                params![id, format_datetime(old)],
            )
            .unwrap();
        }
        drop(conn);

        let removed = db.purge_insights(config.purge_days).unwrap();
        assert_eq!(removed, 2); // stale active + stale dismissed

        assert!(db.get_insight(&stale_implemented.id).unwrap().is_some());
        assert!(db.get_insight(&fresh.id).unwrap().is_some());
        assert!(db.get_insight(&stale_active.id).unwrap().is_none());
    }

    #[test]
    fn test_summary_counts() {
        let db = Database::in_memory().unwrap();
        let config = EngineConfig::default();

        let a = draft("time:31:6-8", 0.9);
        let b = draft("time:31:9-10", 0.8);
        let c = draft("time:31:11-12", 0.7);
        db.upsert_from_synthesis(&[a.clone(), b.clone(), c], &config)
            .unwrap();
        db.dismiss_insight(&a.id).unwrap();
        db.implement_insight(&b.id).unwrap();

        let summary = db.insight_summary().unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.active, 1);
        assert_eq!(summary.dismissed, 1);
        assert_eq!(summary.implemented, 1);
        assert_eq!(summary.by_kind["automation"], 3);
        assert_eq!(summary.by_kind["security"], 0);
        assert!(summary.last_updated.is_some());
    }
}
