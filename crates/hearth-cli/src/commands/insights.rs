//! Insight listing and lifecycle commands

use anyhow::Result;
use std::path::Path;

use hearth_core::{InsightKind, InsightStatus};

use super::open_db;

/// List insights with optional filters.
pub fn cmd_insights_list(
    db: Option<&Path>,
    status: Option<&str>,
    kind: Option<&str>,
    json: bool,
) -> Result<()> {
    let database = open_db(db)?;

    let status = status
        .map(|raw| raw.parse::<InsightStatus>().map_err(anyhow::Error::msg))
        .transpose()?;
    let kind = kind
        .map(|raw| raw.parse::<InsightKind>().map_err(anyhow::Error::msg))
        .transpose()?;

    let insights = database.list_insights(status, kind)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&insights)?);
        return Ok(());
    }
    if insights.is_empty() {
        println!("No insights.");
        return Ok(());
    }

    println!(
        "{:<18} {:<12} {:<11} {:>5}  {}",
        "ID", "KIND", "STATUS", "CONF", "TITLE"
    );
    for insight in insights {
        println!(
            "{:<18} {:<12} {:<11} {:>4.0}%  {}",
            insight.id,
            insight.kind,
            insight.status,
            insight.confidence * 100.0,
            insight.title
        );
    }

    Ok(())
}

/// Show one insight in full.
pub fn cmd_insights_show(db: Option<&Path>, id: &str) -> Result<()> {
    let database = open_db(db)?;
    let insight = database
        .get_insight(id)?
        .ok_or_else(|| anyhow::anyhow!("No insight with id {}", id))?;

    println!("{} ({})", insight.title, insight.id);
    println!("  kind:       {}", insight.kind);
    println!("  status:     {}", insight.status);
    println!("  confidence: {:.0}%", insight.confidence * 100.0);
    println!("  entity:     {}", insight.primary_entity);
    for related in &insight.related_entities {
        println!("  related:    {}", related);
    }
    println!("  updated:    {}", insight.updated_at.format("%Y-%m-%d %H:%M"));
    println!();
    println!("{}", insight.description);
    if !insight.suggestions.is_empty() {
        println!();
        for suggestion in &insight.suggestions {
            println!("  - {}", suggestion);
        }
    }
    if let Some(yaml) = &insight.yaml {
        println!();
        println!("{}", yaml);
    }

    Ok(())
}

/// Dismiss an insight.
pub fn cmd_insights_dismiss(db: Option<&Path>, id: &str) -> Result<()> {
    let database = open_db(db)?;
    database.dismiss_insight(id)?;
    println!("Dismissed {}", id);
    Ok(())
}

/// Mark an insight as implemented.
pub fn cmd_insights_implement(db: Option<&Path>, id: &str) -> Result<()> {
    let database = open_db(db)?;
    database.implement_insight(id)?;
    println!("Marked {} as implemented", id);
    Ok(())
}
