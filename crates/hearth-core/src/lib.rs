//! Hearth Core Library
//!
//! Shared functionality for the Hearth smart-home insight engine:
//! - Event store: bounded, queryable state-change history
//! - Pattern detector: recurring time-of-day / day-of-week windows
//! - Correlation detector: lag-correlated entity pairs
//! - Insight synthesis: typed, scored, de-duplicated suggestions with
//!   automation YAML rendering
//! - Insight store and lifecycle: dismiss / implement / purge / summary
//! - Scan engine: non-overlapping scheduled analysis

pub mod config;
pub mod db;
pub mod detect;
pub mod error;
pub mod insights;
pub mod models;
pub mod profile;
pub mod scan;

pub use config::{default_config_path, default_data_dir, default_db_path, EngineConfig};
pub use db::{Database, EventStats, IngestOutcome, SynthesisStats};
pub use error::{Error, Result};
pub use insights::{Insight, InsightDraft, InsightKind, InsightStatus, InsightSummary};
pub use models::{entity_domain, EntityMeta, StateEvent, StateValue};
pub use scan::{InsightScanner, ScanOutcome, ScanReport};
