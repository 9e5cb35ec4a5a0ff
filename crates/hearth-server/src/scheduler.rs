//! Background scan scheduler
//!
//! Runs a scan every `scan_interval_minutes`. The scanner's in-flight guard
//! makes an overrunning scan skip the next tick rather than queueing it, so
//! slow scans can never build a backlog.

use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info};

use hearth_core::{InsightScanner, ScanOutcome};

/// Start the scan scheduler as a background task.
pub fn start_scan_scheduler(scanner: InsightScanner) {
    let minutes = scanner.config().scan_interval_minutes;
    info!("Starting scan scheduler: every {} minutes", minutes);

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(minutes * 60));

        // Skip the first immediate tick - ingestion needs time to build a
        // window before the first scheduled scan
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let scanner = scanner.clone();
            let result = tokio::task::spawn_blocking(move || scanner.run_scan()).await;

            match result {
                Ok(Ok(report)) => match report.outcome {
                    ScanOutcome::Completed => {
                        info!(
                            inserted = report.merge.inserted,
                            updated = report.merge.updated,
                            purged = report.purged,
                            "Scheduled scan completed"
                        );
                    }
                    ScanOutcome::SkippedOverlap => {
                        info!("Scheduled scan skipped: previous scan still running");
                    }
                },
                Ok(Err(e)) => {
                    error!("Scheduled scan failed: {}", e);
                }
                Err(e) => {
                    error!("Scheduled scan panicked: {}", e);
                }
            }
        }
    });
}
