//! Engine configuration
//!
//! All thresholds the host can tune live here. Configuration is loaded from a
//! TOML file with defaults for any missing field, and validated before a
//! scanner is constructed so a scan never starts on a bad config.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::entity_domain;

/// Domains tracked by default when the host does not configure its own list.
pub const DEFAULT_TRACKED_DOMAINS: &[&str] = &[
    "light",
    "switch",
    "climate",
    "sensor",
    "binary_sensor",
    "cover",
    "media_player",
    "person",
    "device_tracker",
    "lock",
    "alarm_control_panel",
    "fan",
];

/// Engine configuration with host-tunable thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minutes between scheduled scans.
    pub scan_interval_minutes: u64,
    /// Domains whose entities are tracked; events outside are dropped.
    pub tracked_domains: BTreeSet<String>,
    /// Entity ids excluded from tracking and pairing.
    pub excluded_entities: BTreeSet<String>,
    /// Minimum transitions in the lookback window before an entity can
    /// produce pattern candidates. This is the primary noise filter.
    pub min_state_changes: u32,
    /// Cap on active insights after synthesis; surplus is held back.
    pub max_suggestions: usize,
    /// Age in days beyond which dismissed and stale active insights are purged.
    pub purge_days: i64,
    /// Analysis window for detectors, in days.
    pub lookback_days: i64,
    /// Event retention horizon in days. Independent of (and typically longer
    /// than) purge_days, since pattern detection needs multi-week history.
    pub retention_days: i64,
    /// Per-entity cap on retained events.
    pub max_events_per_entity: i64,
    /// A grid bucket is active when its count exceeds the mean bucket density
    /// times this factor.
    pub density_factor: f64,
    /// Minimum co-occurrence count for a correlation candidate.
    pub min_support: u32,
    /// Minimum lift (conditional probability over base rate) for a
    /// correlation candidate.
    pub min_lift: f64,
    /// A dismissed insight reactivates only when its recomputed confidence
    /// exceeds the stored confidence by more than this margin.
    pub reactivation_margin: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scan_interval_minutes: 60,
            tracked_domains: DEFAULT_TRACKED_DOMAINS
                .iter()
                .map(|d| d.to_string())
                .collect(),
            excluded_entities: BTreeSet::new(),
            min_state_changes: 50,
            max_suggestions: 15,
            purge_days: 30,
            lookback_days: 28,
            retention_days: 30,
            max_events_per_entity: 1000,
            density_factor: 3.0,
            min_support: 5,
            min_lift: 2.0,
            reactivation_margin: 0.15,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist. The result is validated.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            toml::from_str(&raw)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate thresholds, rejecting values that would make a scan
    /// meaningless or unbounded.
    pub fn validate(&self) -> Result<()> {
        if self.scan_interval_minutes == 0 {
            return Err(Error::Config("scan_interval_minutes must be positive".into()));
        }
        if self.tracked_domains.is_empty() {
            return Err(Error::Config("tracked_domains must not be empty".into()));
        }
        if self.min_state_changes == 0 {
            return Err(Error::Config("min_state_changes must be positive".into()));
        }
        if self.max_suggestions == 0 {
            return Err(Error::Config("max_suggestions must be positive".into()));
        }
        if self.purge_days <= 0 {
            return Err(Error::Config("purge_days must be positive".into()));
        }
        if self.lookback_days <= 0 {
            return Err(Error::Config("lookback_days must be positive".into()));
        }
        if self.retention_days <= 0 {
            return Err(Error::Config("retention_days must be positive".into()));
        }
        if self.max_events_per_entity <= 0 {
            return Err(Error::Config("max_events_per_entity must be positive".into()));
        }
        if self.density_factor <= 0.0 {
            return Err(Error::Config("density_factor must be positive".into()));
        }
        if self.min_lift <= 0.0 {
            return Err(Error::Config("min_lift must be positive".into()));
        }
        if self.reactivation_margin < 0.0 || self.reactivation_margin > 1.0 {
            return Err(Error::Config(
                "reactivation_margin must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }

    /// Render the config as TOML (used by `hearth init` to write defaults).
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Whether an entity is inside the tracked-domain allow-list and not
    /// explicitly excluded.
    pub fn is_tracked(&self, entity_id: &str) -> bool {
        if self.excluded_entities.contains(entity_id) {
            return false;
        }
        match entity_domain(entity_id) {
            Some(domain) => self.tracked_domains.contains(domain),
            None => false,
        }
    }
}

/// Default data directory (~/.local/share/hearth on Linux).
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hearth")
}

/// Default database path inside the data directory.
pub fn default_db_path() -> PathBuf {
    default_data_dir().join("hearth.db")
}

/// Default configuration file path inside the data directory.
pub fn default_config_path() -> PathBuf {
    default_data_dir().join("hearth.toml")
}
