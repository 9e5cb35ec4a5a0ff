//! Hearth CLI - smart-home insight engine
//!
//! Usage:
//!   hearth init                 Initialize database and config
//!   hearth serve --port 8090    Start the API server + scan scheduler
//!   hearth scan                 Run one insight scan now
//!   hearth insights             List generated insights

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let db = cli.db.as_deref();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Init => commands::cmd_init(db, config),
        Commands::Serve { host, port } => commands::cmd_serve(db, config, &host, port).await,
        Commands::Scan => commands::cmd_scan(db, config),
        Commands::Insights { action } => match action {
            None => commands::cmd_insights_list(db, None, None, false),
            Some(InsightsAction::List { status, kind, json }) => {
                commands::cmd_insights_list(db, status.as_deref(), kind.as_deref(), json)
            }
            Some(InsightsAction::Show { id }) => commands::cmd_insights_show(db, &id),
            Some(InsightsAction::Dismiss { id }) => commands::cmd_insights_dismiss(db, &id),
            Some(InsightsAction::Implement { id }) => commands::cmd_insights_implement(db, &id),
        },
        Commands::Purge { days } => commands::cmd_purge(db, config, days),
        Commands::Status => commands::cmd_status(db, config),
    }
}
