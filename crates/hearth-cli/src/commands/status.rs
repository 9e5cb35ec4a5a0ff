//! status command

use anyhow::Result;
use std::path::Path;

use super::{load_config, open_db};

/// Print event-store and insight-store status.
pub fn cmd_status(db: Option<&Path>, config: Option<&Path>) -> Result<()> {
    let database = open_db(db)?;
    let engine_config = load_config(config)?;

    let events = database.event_stats()?;
    println!("Event store:");
    println!("  events:   {}", events.total_events);
    println!("  entities: {}", events.tracked_entities);
    if let (Some(oldest), Some(newest)) = (events.oldest, events.newest) {
        println!(
            "  window:   {} .. {}",
            oldest.format("%Y-%m-%d %H:%M"),
            newest.format("%Y-%m-%d %H:%M")
        );
    }

    let summary = database.insight_summary()?;
    println!("Insights:");
    println!("  active:      {}", summary.active);
    println!("  dismissed:   {}", summary.dismissed);
    println!("  implemented: {}", summary.implemented);
    for (kind, count) in &summary.by_kind {
        if *count > 0 {
            println!("    {:<12} {}", kind, count);
        }
    }

    match database.last_scan()? {
        Some(at) => println!("Last scan: {}", at.format("%Y-%m-%d %H:%M")),
        None => println!("Last scan: never"),
    }
    println!(
        "Scan interval: {} minutes (lookback {} days)",
        engine_config.scan_interval_minutes, engine_config.lookback_days
    );

    Ok(())
}
