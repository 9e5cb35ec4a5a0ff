//! Lag-correlated transition detection between entity pairs
//!
//! For each ordered (trigger, response) pair and each lag bucket, support is
//! the number of trigger transitions followed by a response transition within
//! the lag. Confidence is the conditional probability of response given
//! trigger; lift compares it to the response's base transition rate scaled to
//! the lag width. Pairs need minimum support and lift to survive, which keeps
//! rare-event coincidences out.
//!
//! The sweep is inherently O(entities²); it is bounded by the tracked-domain
//! allow-list applied at ingest, the exclusion list applied before pairing,
//! and a temporal-overlap short-circuit per pair.

use tracing::{debug, warn};

use super::{Candidate, Detector, DetectorInput};
use crate::error::Result;
use crate::models::StateEvent;

/// Candidate lag windows. Lower bound exclusive, upper bound inclusive, in
/// seconds; a response in the same second as its trigger is not counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LagBucket {
    /// 0–1 minute
    Immediate,
    /// 1–5 minutes
    Short,
    /// 5–30 minutes
    Medium,
}

impl LagBucket {
    pub fn all() -> [LagBucket; 3] {
        [LagBucket::Immediate, LagBucket::Short, LagBucket::Medium]
    }

    /// (exclusive lower, inclusive upper) bound in seconds.
    pub fn bounds(self) -> (i64, i64) {
        match self {
            LagBucket::Immediate => (0, 60),
            LagBucket::Short => (60, 300),
            LagBucket::Medium => (300, 1800),
        }
    }

    /// Stable key for insight signatures.
    pub fn key(self) -> &'static str {
        match self {
            LagBucket::Immediate => "0-60",
            LagBucket::Short => "60-300",
            LagBucket::Medium => "300-1800",
        }
    }

    /// Readable label for descriptions.
    pub fn label(self) -> &'static str {
        match self {
            LagBucket::Immediate => "within a minute",
            LagBucket::Short => "within 5 minutes",
            LagBucket::Medium => "within 30 minutes",
        }
    }

    fn width_seconds(self) -> i64 {
        let (lo, hi) = self.bounds();
        hi - lo
    }
}

/// A statistically supported lag relationship between two entities.
#[derive(Debug, Clone)]
pub struct CorrelationCandidate {
    pub trigger_entity: String,
    pub response_entity: String,
    pub lag: LagBucket,
    /// Trigger transitions followed by a response within the lag.
    pub support: u32,
    /// Total trigger transitions in the window.
    pub trigger_count: u32,
    /// support / trigger_count.
    pub confidence: f64,
    /// confidence over the response's base rate in a lag-sized window.
    pub lift: f64,
}

impl CorrelationCandidate {
    /// Stable signature for the deterministic insight id. Directional: the
    /// sorted entity ids in the id tuple would otherwise collapse A→B and
    /// B→A into one insight.
    pub fn signature(&self) -> String {
        format!(
            "corr:{}->{}:{}",
            self.trigger_entity,
            self.response_entity,
            self.lag.key()
        )
    }
}

/// Detector for lag-correlated entity pairs.
pub struct CorrelationDetector;

impl Detector for CorrelationDetector {
    fn name(&self) -> &'static str {
        "correlations"
    }

    fn detect(&self, input: &DetectorInput<'_>) -> Result<Vec<Candidate>> {
        let window_seconds = (input.window.1 - input.window.0).num_seconds();
        if window_seconds <= 0 {
            return Ok(Vec::new());
        }

        // Exclusion applies before pairing, so a reconfigured exclusion list
        // takes effect even for already-retained history.
        let entities: Vec<(&String, &Vec<StateEvent>)> = input
            .events_by_entity
            .iter()
            .filter(|(entity_id, events)| {
                !events.is_empty() && input.config.is_tracked(entity_id)
            })
            .collect();

        let max_lag = LagBucket::Medium.bounds().1;
        let mut candidates = Vec::new();

        for (trigger_id, trigger_events) in &entities {
            for (response_id, response_events) in &entities {
                if trigger_id == response_id {
                    continue;
                }
                match correlate_pair(
                    trigger_id,
                    trigger_events,
                    response_id,
                    response_events,
                    window_seconds,
                    max_lag,
                    input,
                ) {
                    Ok(Some(candidate)) => candidates.push(candidate),
                    Ok(None) => {}
                    Err(e) => {
                        warn!(
                            trigger = %trigger_id,
                            response = %response_id,
                            error = %e,
                            "Skipping pair in correlation sweep"
                        );
                    }
                }
            }
        }

        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.lift
                        .partial_cmp(&a.lift)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });

        Ok(candidates.into_iter().map(Candidate::Correlation).collect())
    }
}

/// Evaluate one ordered pair, returning its best lag bucket if any passes
/// the support and lift gates.
#[allow(clippy::too_many_arguments)]
fn correlate_pair(
    trigger_id: &str,
    trigger_events: &[StateEvent],
    response_id: &str,
    response_events: &[StateEvent],
    window_seconds: i64,
    max_lag: i64,
    input: &DetectorInput<'_>,
) -> Result<Option<CorrelationCandidate>> {
    // Short-circuit pairs with no temporal overlap
    let trigger_first = trigger_events.first().map(|e| e.timestamp.timestamp());
    let trigger_last = trigger_events.last().map(|e| e.timestamp.timestamp());
    let response_first = response_events.first().map(|e| e.timestamp.timestamp());
    let response_last = response_events.last().map(|e| e.timestamp.timestamp());
    let (Some(t_first), Some(t_last), Some(r_first), Some(r_last)) =
        (trigger_first, trigger_last, response_first, response_last)
    else {
        return Ok(None);
    };
    if r_last <= t_first || r_first > t_last + max_lag {
        return Ok(None);
    }

    let response_times: Vec<i64> = response_events
        .iter()
        .map(|e| e.timestamp.timestamp())
        .collect();

    let trigger_count = trigger_events.len() as u32;
    let mut best: Option<CorrelationCandidate> = None;

    for lag in LagBucket::all() {
        let (lo, hi) = lag.bounds();

        let mut support = 0u32;
        for trigger in trigger_events {
            let t = trigger.timestamp.timestamp();
            // Any response transition in (t + lo, t + hi]
            let from = response_times.partition_point(|&r| r <= t + lo);
            if from < response_times.len() && response_times[from] <= t + hi {
                support += 1;
            }
        }

        if support < input.config.min_support {
            continue;
        }

        let confidence = support as f64 / trigger_count as f64;
        let base_rate = (response_times.len() as f64 * lag.width_seconds() as f64
            / window_seconds as f64)
            .min(1.0);
        if base_rate <= 0.0 {
            continue;
        }
        let lift = confidence / base_rate;
        if lift < input.config.min_lift {
            continue;
        }

        let candidate = CorrelationCandidate {
            trigger_entity: trigger_id.to_string(),
            response_entity: response_id.to_string(),
            lag,
            support,
            trigger_count,
            confidence,
            lift,
        };

        let better = match &best {
            None => true,
            Some(current) => {
                candidate.confidence > current.confidence
                    || (candidate.confidence == current.confidence
                        && candidate.lift > current.lift)
            }
        };
        if better {
            best = Some(candidate);
        }
    }

    if let Some(candidate) = &best {
        debug!(
            trigger = %candidate.trigger_entity,
            response = %candidate.response_entity,
            lag = candidate.lag.key(),
            support = candidate.support,
            confidence = candidate.confidence,
            lift = candidate.lift,
            "Correlation candidate"
        );
    }

    Ok(best)
}
