//! Status reporting to the stats backend
//!
//! Every lifecycle milestone of a health check run is forwarded to the
//! stats backend as a `{taskId, status}` JSON document on
//! `POST /v2/healthcheck/status`. The reporter returns a `Result` so the
//! caller decides whether a failed report matters; the runner logs and
//! carries on.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ReporterSettings;
use crate::error::{Error, Result};

/// One status report, constructed fresh per milestone and never retained
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport<'a> {
    pub task_id: &'a str,
    pub status: &'a str,
}

/// Error body the backend answers non-2xx responses with
#[derive(Debug, Deserialize)]
struct BackendError {
    error: Option<String>,
}

/// Sink for lifecycle status reports
///
/// Object-safe so the runner can be driven by a recording sink in tests.
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Submit one status string for the given task
    async fn submit(&self, task_id: &str, status: &str) -> Result<()>;
}

/// HTTP reporter posting to the stats backend
pub struct HttpReporter {
    client: Client,
    endpoint: String,
}

impl HttpReporter {
    /// Path of the status endpoint on the stats backend
    pub const STATUS_PATH: &'static str = "/v2/healthcheck/status";

    /// Create a reporter from resolved settings
    pub fn new(settings: &ReporterSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", settings.resolved_base_url(), Self::STATUS_PATH),
        })
    }

    /// The fully resolved endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl StatusSink for HttpReporter {
    async fn submit(&self, task_id: &str, status: &str) -> Result<()> {
        let report = StatusReport { task_id, status };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&report)
            .send()
            .await?;

        let http_status = response.status();
        if http_status.is_success() {
            debug!(task_id, status, "Status report submitted");
            return Ok(());
        }

        // Decode the backend's error body when it has one
        let message = match response.json::<BackendError>().await {
            Ok(body) => body.error.unwrap_or_else(|| "unknown error".to_string()),
            Err(e) => format!("undecodable error body: {}", e),
        };

        Err(Error::ReportRejected {
            status: http_status.as_u16(),
            message,
        })
    }
}
