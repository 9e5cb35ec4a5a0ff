//! serve command

use anyhow::Result;
use std::path::Path;

use super::open_scanner;

/// Start the API server with the background scan scheduler.
pub async fn cmd_serve(
    db: Option<&Path>,
    config: Option<&Path>,
    host: &str,
    port: u16,
) -> Result<()> {
    let scanner = open_scanner(db, config)?;
    hearth_server::serve(scanner, host, port).await
}
