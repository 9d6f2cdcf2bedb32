//! REST executor against the local marketplace daemon
//!
//! Implements the execution seam by driving the daemon's session API:
//! create a session scoped to an image, allow-list, payment network, and
//! budget; poll until a provider picks it up; submit exec batches and poll
//! their results; delete the session when done. Deadlines surface as
//! tagged timeout errors so the runner can classify them.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::config::ExecutorSettings;
use crate::error::{Error, Result};

use super::{ExecOutput, TaskExecutor, TaskSession};

// ─────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionRequest<'a> {
    image: &'a str,
    provider_allowlist: &'a [String],
    payment_network: &'a str,
    budget: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionStateResponse {
    state: String,
    provider_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecRequest<'a> {
    command: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecCreateResponse {
    exec_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecStateResponse {
    state: String,
    stdout: Option<String>,
    stderr: Option<String>,
    exit_code: Option<i32>,
    error: Option<String>,
}

// ─────────────────────────────────────────────────────────────────
// Executor
// ─────────────────────────────────────────────────────────────────

/// Executor backed by the marketplace daemon's REST API
pub struct RestExecutor {
    client: Client,
    api_url: String,
    settings: ExecutorSettings,
    allowlist: Vec<String>,
    network: String,
    // Session created by acquire(), cleared once released
    active_session: Mutex<Option<String>>,
}

impl RestExecutor {
    /// Create an executor scoped to the given allow-list and payment network
    pub fn new(settings: &ExecutorSettings, allowlist: Vec<String>, network: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            settings: settings.clone(),
            allowlist,
            network,
            active_session: Mutex::new(None),
        })
    }

    fn session_url(&self, session_id: &str) -> String {
        format!("{}/v1/sessions/{}", self.api_url, session_id)
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.session_url(session_id))
            .send()
            .await?;

        // Already gone is fine; shutdown must be idempotent
        if !response.status().is_success() && response.status().as_u16() != 404 {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Internal(format!(
                "Failed to release session ({}): {}",
                status, body
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskExecutor for RestExecutor {
    async fn acquire(&self) -> Result<Box<dyn TaskSession>> {
        let request = CreateSessionRequest {
            image: &self.settings.image,
            provider_allowlist: &self.allowlist,
            payment_network: &self.network,
            budget: &self.settings.budget,
        };

        let response = self
            .client
            .post(format!("{}/v1/sessions", self.api_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::session_create(format!(
                "Daemon refused session ({}): {}",
                status, body
            )));
        }

        let created: CreateSessionResponse = response.json().await?;
        let session_id = created.session_id;
        *self.active_session.lock() = Some(session_id.clone());
        debug!(session_id = %session_id, "Session created, waiting for a provider");

        // Poll until a provider accepts the task or the deadline passes
        let deadline = Instant::now() + Duration::from_secs(self.settings.provider_wait_secs);
        let poll_interval = Duration::from_millis(self.settings.poll_interval_ms);

        loop {
            if Instant::now() >= deadline {
                // Best effort cleanup before surfacing the timeout
                if let Err(e) = self.delete_session(&session_id).await {
                    warn!(error = %e, "Failed to release timed out session");
                }
                *self.active_session.lock() = None;
                return Err(Error::ProviderTimeout {
                    waited_secs: self.settings.provider_wait_secs,
                });
            }

            sleep(poll_interval).await;

            let state: SessionStateResponse = self
                .client
                .get(self.session_url(&session_id))
                .send()
                .await?
                .json()
                .await?;

            match state.state.as_str() {
                "pending" => continue,
                "ready" => {
                    let provider_id = state.provider_id.unwrap_or_else(|| "unknown".to_string());
                    debug!(provider_id = %provider_id, "Provider accepted the task");
                    return Ok(Box::new(RestSession {
                        client: self.client.clone(),
                        url: self.session_url(&session_id),
                        provider_id,
                        exec_timeout_secs: self.settings.exec_timeout_secs,
                        poll_interval,
                    }));
                }
                "failed" => {
                    *self.active_session.lock() = None;
                    return Err(Error::session_create(
                        state.error.unwrap_or_else(|| "session failed".to_string()),
                    ));
                }
                other => {
                    return Err(Error::Internal(format!(
                        "Unexpected session state '{}'",
                        other
                    )));
                }
            }
        }
    }

    async fn shutdown(&self) -> Result<()> {
        let session_id = self.active_session.lock().take();
        if let Some(id) = session_id {
            debug!(session_id = %id, "Releasing session on shutdown");
            self.delete_session(&id).await?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────

/// A ready session on one provider
struct RestSession {
    client: Client,
    url: String,
    provider_id: String,
    exec_timeout_secs: u64,
    poll_interval: Duration,
}

#[async_trait]
impl TaskSession for RestSession {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    async fn exec(&self, command: &str) -> Result<ExecOutput> {
        let response = self
            .client
            .post(format!("{}/exec", self.url))
            .json(&ExecRequest { command })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::exec_failed(format!(
                "Daemon refused exec ({}): {}",
                status, body
            )));
        }

        let created: ExecCreateResponse = response.json().await?;
        debug!(exec_id = %created.exec_id, command, "Exec batch submitted");

        let deadline = Instant::now() + Duration::from_secs(self.exec_timeout_secs);

        loop {
            if Instant::now() >= deadline {
                return Err(Error::ExecTimeout {
                    waited_secs: self.exec_timeout_secs,
                });
            }

            sleep(self.poll_interval).await;

            let state: ExecStateResponse = self
                .client
                .get(format!("{}/exec/{}", self.url, created.exec_id))
                .send()
                .await?
                .json()
                .await?;

            match state.state.as_str() {
                "pending" | "running" => continue,
                "finished" => {
                    return Ok(ExecOutput {
                        stdout: state.stdout.unwrap_or_default(),
                        stderr: state.stderr.unwrap_or_default(),
                        exit_code: state.exit_code.unwrap_or(0),
                    });
                }
                "failed" => {
                    return Err(Error::exec_failed(
                        state.error.unwrap_or_else(|| "exec failed".to_string()),
                    ));
                }
                other => {
                    return Err(Error::Internal(format!("Unexpected exec state '{}'", other)));
                }
            }
        }
    }

    async fn close(&self) -> Result<()> {
        let response = self.client.delete(&self.url).send().await?;
        if !response.status().is_success() && response.status().as_u16() != 404 {
            warn!(status = %response.status(), "Session close returned non-success");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutorSettings;

    #[test]
    fn test_create_session_wire_shape() {
        let allowlist = vec!["0xprovider".to_string()];
        let request = CreateSessionRequest {
            image: "golem/alpine:latest",
            provider_allowlist: &allowlist,
            payment_network: "holesky",
            budget: "0.000001",
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["image"], "golem/alpine:latest");
        assert_eq!(value["providerAllowlist"][0], "0xprovider");
        assert_eq!(value["paymentNetwork"], "holesky");
        assert_eq!(value["budget"], "0.000001");
    }

    #[test]
    fn test_exec_state_parses_partial_body() {
        let state: ExecStateResponse =
            serde_json::from_str(r#"{"state":"running"}"#).unwrap();
        assert_eq!(state.state, "running");
        assert!(state.stdout.is_none());
        assert!(state.exit_code.is_none());
        assert!(state.error.is_none());
    }

    #[test]
    fn test_api_url_trailing_slash_trimmed() {
        let settings = ExecutorSettings {
            api_url: "http://127.0.0.1:7465/".to_string(),
            ..Default::default()
        };
        let executor =
            RestExecutor::new(&settings, vec!["p".to_string()], "holesky".to_string()).unwrap();
        assert_eq!(
            executor.session_url("abc"),
            "http://127.0.0.1:7465/v1/sessions/abc"
        );
    }
}
