//! CLI command implementations

mod core;
mod insights;
mod serve;
mod status;

pub use core::{cmd_init, cmd_purge, cmd_scan};
pub use insights::{cmd_insights_dismiss, cmd_insights_implement, cmd_insights_list, cmd_insights_show};
pub use serve::cmd_serve;
pub use status::cmd_status;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use hearth_core::{
    default_config_path, default_db_path, Database, EngineConfig, InsightScanner,
};

/// Resolve the database path, creating parent directories.
pub fn resolve_db_path(db: Option<&Path>) -> Result<PathBuf> {
    let path = db.map(PathBuf::from).unwrap_or_else(default_db_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
    }
    Ok(path)
}

/// Load the engine config from the given or default path.
pub fn load_config(config: Option<&Path>) -> Result<EngineConfig> {
    let path = config.map(PathBuf::from).unwrap_or_else(default_config_path);
    EngineConfig::load(&path).with_context(|| format!("Failed to load config {}", path.display()))
}

/// Open the database at the given or default path.
pub fn open_db(db: Option<&Path>) -> Result<Database> {
    let path = resolve_db_path(db)?;
    Database::new(&path.to_string_lossy())
        .with_context(|| format!("Failed to open database {}", path.display()))
}

/// Open a scanner over a validated config.
pub fn open_scanner(db: Option<&Path>, config: Option<&Path>) -> Result<InsightScanner> {
    let database = open_db(db)?;
    let config = load_config(config)?;
    Ok(InsightScanner::new(database, config)?)
}
