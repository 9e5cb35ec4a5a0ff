//! init, scan, and purge commands

use anyhow::Result;
use std::path::Path;

use hearth_core::{default_config_path, EngineConfig, ScanOutcome};

use super::{load_config, open_db, open_scanner, resolve_db_path};

/// Initialize the database and write a default config file if missing.
pub fn cmd_init(db: Option<&Path>, config: Option<&Path>) -> Result<()> {
    let db_path = resolve_db_path(db)?;
    open_db(Some(&db_path))?;
    println!("Database ready at {}", db_path.display());

    let config_path = config
        .map(std::path::PathBuf::from)
        .unwrap_or_else(default_config_path);
    if !config_path.exists() {
        std::fs::write(&config_path, EngineConfig::default().to_toml()?)?;
        println!("Wrote default config to {}", config_path.display());
    } else {
        println!("Config already present at {}", config_path.display());
    }

    Ok(())
}

/// Run one scan now and print the report.
pub fn cmd_scan(db: Option<&Path>, config: Option<&Path>) -> Result<()> {
    let scanner = open_scanner(db, config)?;
    let report = scanner.run_scan()?;

    match report.outcome {
        ScanOutcome::SkippedOverlap => {
            println!("Scan skipped: a scan is already running");
        }
        ScanOutcome::Completed => {
            println!(
                "Scan complete: {} events, {} entities",
                report.events_considered, report.entities_seen
            );
            println!(
                "  candidates: {} patterns, {} correlations",
                report.pattern_candidates, report.correlation_candidates
            );
            println!(
                "  insights: {} new, {} updated, {} reactivated, {} suppressed, {} held back",
                report.merge.inserted,
                report.merge.updated,
                report.merge.reactivated,
                report.merge.suppressed,
                report.merge.held_back
            );
            if report.purged > 0 {
                println!("  purged: {}", report.purged);
            }
        }
    }

    Ok(())
}

/// Purge old insights, optionally overriding the configured horizon.
pub fn cmd_purge(db: Option<&Path>, config: Option<&Path>, days: Option<i64>) -> Result<()> {
    let database = open_db(db)?;
    let engine_config = load_config(config)?;

    let horizon = days.unwrap_or(engine_config.purge_days);
    if horizon <= 0 {
        anyhow::bail!("purge horizon must be positive, got {}", horizon);
    }

    let removed = database.purge_insights(horizon)?;
    println!("Purged {} insights older than {} days", removed, horizon);
    Ok(())
}
