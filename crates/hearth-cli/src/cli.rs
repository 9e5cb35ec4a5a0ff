//! CLI argument definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "hearth",
    version,
    about = "Smart-home insight engine: detects patterns in entity history and suggests automations"
)]
pub struct Cli {
    /// Database file path (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Engine config file path (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and write a default config file
    Init,

    /// Start the REST API server with the background scan scheduler
    Serve {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Bind port
        #[arg(long, default_value_t = 8090)]
        port: u16,
    },

    /// Run one insight scan now
    Scan,

    /// List and manage insights
    Insights {
        #[command(subcommand)]
        action: Option<InsightsAction>,
    },

    /// Purge dismissed and stale insights past the horizon
    Purge {
        /// Override the configured purge horizon in days
        #[arg(long)]
        days: Option<i64>,
    },

    /// Show event-store and insight-store status
    Status,
}

#[derive(Subcommand)]
pub enum InsightsAction {
    /// List insights (default)
    List {
        /// Filter by status: active, dismissed, implemented
        #[arg(long)]
        status: Option<String>,

        /// Filter by kind: automation, energy, comfort, convenience, security
        #[arg(long)]
        kind: Option<String>,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one insight in full, including any automation YAML
    Show { id: String },

    /// Dismiss an insight
    Dismiss { id: String },

    /// Mark an insight as implemented
    Implement { id: String },
}
