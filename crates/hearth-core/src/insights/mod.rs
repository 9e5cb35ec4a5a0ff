//! Insight synthesis, types, and automation rendering
//!
//! Converts raw detector candidates into typed, scored, de-duplicated
//! insights ready for the store.

mod synthesize;
mod types;
mod yaml;

pub use synthesize::{synthesize, CONTROLLABLE_DOMAINS, HIGH_DRAW_DOMAINS, SECURITY_DOMAINS};
pub use types::{
    deterministic_id, Insight, InsightDraft, InsightKind, InsightStatus, InsightSummary,
};
pub use yaml::{render_state_automation, render_time_automation};
