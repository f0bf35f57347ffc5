//! # Stdin Event Source
//!
//! Local stand-in for the radio transport boundary: decoded telemetry
//! events arrive as NDJSON lines on stdin and are fed into the ingest
//! channel. The real mesh interface lives outside the collector and hands
//! over the same shape.
//!
//! An undecodable line is logged and skipped; the stream keeps flowing.

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use mesh_ingest::{IngestHandle, TelemetryEvent};

/// Reads NDJSON events from stdin until EOF or worker shutdown.
pub async fn run_stdin_source(ingest: IngestHandle) {
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    info!("Reading NDJSON telemetry events from stdin");

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match serde_json::from_str::<TelemetryEvent>(line) {
                    Ok(event) => {
                        if ingest.submit(event).await.is_err() {
                            info!("Ingest worker stopped; event source exiting");
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "Skipping undecodable event line"),
                }
            }
            Ok(None) => {
                info!("Event source reached end of input");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read event line; event source exiting");
                break;
            }
        }
    }
}
