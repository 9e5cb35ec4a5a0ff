//! Scan orchestration
//!
//! One scheduled scan per interval: take a snapshot of the event window, run
//! both detectors independently, synthesize and merge insights, then purge.
//! Scans never overlap: a tick arriving while one is in flight is skipped,
//! not queued, so slow scans cannot build a backlog.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::config::EngineConfig;
use crate::db::{Database, SynthesisStats};
use crate::detect::{
    group_by_entity, run_detectors, Candidate, CorrelationDetector, Detector, DetectorInput,
    TimePatternDetector,
};
use crate::error::Result;
use crate::insights::synthesize;
use crate::models::EntityMeta;

/// How a scan request resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    /// The scan ran to completion.
    Completed,
    /// A prior scan was still in flight; this tick was skipped.
    /// Informational, not an error.
    SkippedOverlap,
}

/// Counters for one scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub outcome: ScanOutcome,
    pub started_at: DateTime<Utc>,
    pub events_considered: usize,
    pub entities_seen: usize,
    pub pattern_candidates: usize,
    pub correlation_candidates: usize,
    pub drafts: usize,
    pub merge: SynthesisStats,
    pub purged: usize,
}

impl ScanReport {
    fn skipped(at: DateTime<Utc>) -> Self {
        Self {
            outcome: ScanOutcome::SkippedOverlap,
            started_at: at,
            events_considered: 0,
            entities_seen: 0,
            pattern_candidates: 0,
            correlation_candidates: 0,
            drafts: 0,
            merge: SynthesisStats::default(),
            purged: 0,
        }
    }
}

/// Releases the in-flight flag even when a scan errors.
struct ScanGuard(Arc<AtomicBool>);

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The process-wide scan engine: holds the store handle and configuration,
/// and serializes scans. Clones share the in-flight flag, so the scheduler
/// tick and the manual generate-now request keep the same non-overlap
/// guarantee.
#[derive(Clone)]
pub struct InsightScanner {
    db: Database,
    config: EngineConfig,
    in_flight: Arc<AtomicBool>,
}

impl InsightScanner {
    /// Build a scanner over a validated configuration.
    pub fn new(db: Database, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            db,
            config,
            in_flight: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one scan, or report `SkippedOverlap` when one is in flight.
    ///
    /// The snapshot timestamp is fixed at scan start; events ingested while
    /// the scan runs are picked up by the next scan.
    pub fn run_scan(&self) -> Result<ScanReport> {
        let started_at = Utc::now();

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("Scan already in flight, skipping");
            return Ok(ScanReport::skipped(started_at));
        }
        let _guard = ScanGuard(self.in_flight.clone());

        let window_start = started_at - Duration::days(self.config.lookback_days);
        let events = self.db.events_since(None, window_start)?;
        let events_considered = events.len();
        let events_by_entity = group_by_entity(events);
        let entities_seen = events_by_entity.len();

        let input = DetectorInput {
            events_by_entity: &events_by_entity,
            config: &self.config,
            window: (window_start, started_at),
        };

        let detectors: Vec<Box<dyn Detector>> =
            vec![Box::new(TimePatternDetector), Box::new(CorrelationDetector)];
        let candidates = run_detectors(&detectors, &input);

        let pattern_candidates = candidates
            .iter()
            .filter(|c| matches!(c, Candidate::Pattern(_)))
            .count();
        let correlation_candidates = candidates.len() - pattern_candidates;

        let metas = self.entity_metas(&events_by_entity, started_at)?;
        let drafts = synthesize(&candidates, &metas, started_at);

        let merge = self.db.upsert_from_synthesis(&drafts, &self.config)?;
        let purged = self.db.purge_insights(self.config.purge_days)?;
        self.db.set_last_scan(started_at)?;

        let report = ScanReport {
            outcome: ScanOutcome::Completed,
            started_at,
            events_considered,
            entities_seen,
            pattern_candidates,
            correlation_candidates,
            drafts: drafts.len(),
            merge,
            purged,
        };

        info!(
            events = report.events_considered,
            entities = report.entities_seen,
            patterns = report.pattern_candidates,
            correlations = report.correlation_candidates,
            inserted = report.merge.inserted,
            updated = report.merge.updated,
            purged = report.purged,
            "Scan complete"
        );

        Ok(report)
    }

    /// Snapshot metadata for classification, falling back to id-derived
    /// metadata for entities the host never described.
    fn entity_metas(
        &self,
        events_by_entity: &std::collections::BTreeMap<String, Vec<crate::models::StateEvent>>,
        now: DateTime<Utc>,
    ) -> Result<HashMap<String, EntityMeta>> {
        let mut metas: HashMap<String, EntityMeta> = self
            .db
            .list_entities()?
            .into_iter()
            .map(|meta| (meta.entity_id.clone(), meta))
            .collect();

        for entity_id in events_by_entity.keys() {
            if !metas.contains_key(entity_id) {
                if let Some(meta) = EntityMeta::from_entity_id(entity_id, now) {
                    metas.insert(entity_id.clone(), meta);
                }
            }
        }

        Ok(metas)
    }
}
