//! # Aggregator Uplink Client
//!
//! Thin HTTP client that pushes a batch of node records to the configured
//! remote aggregator. The payload is a JSON array of the records; the
//! internal `synced` flag and revision counter never leave the collector
//! (they are skipped at serialization).

use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::error::{SyncError, SyncResult};
use mesh_core::NodeRecord;

/// HTTP client for the remote aggregator endpoint.
#[derive(Debug, Clone)]
pub struct UplinkClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl UplinkClient {
    /// Creates a client for the given endpoint.
    pub fn new(endpoint: Url) -> Self {
        UplinkClient {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// POSTs the batch as a JSON array. Success is exactly HTTP 200; any
    /// other status or a transport failure leaves the batch unsynced at
    /// the caller.
    pub async fn push(&self, batch: &[NodeRecord]) -> SyncResult<()> {
        debug!(count = batch.len(), endpoint = %self.endpoint, "Pushing export batch");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(batch)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SyncError::Rejected {
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}
