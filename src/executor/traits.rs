//! Execution backend trait definitions
//!
//! The marketplace SDK boundary of the runner. Everything behind these
//! traits (provider negotiation, payment, retries) is opaque to the rest
//! of the crate. The traits are object-safe for dynamic dispatch so tests
//! can drive the runner with a scripted executor.

use async_trait::async_trait;

use crate::error::Result;

/// Captured output of one remote command
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    /// Standard output as emitted by the remote command
    pub stdout: String,

    /// Standard error
    pub stderr: String,

    /// Exit code of the remote command
    pub exit_code: i32,
}

/// A negotiated remote session on one provider
#[async_trait]
pub trait TaskSession: Send + Sync {
    /// Identifier of the provider that accepted the task
    fn provider_id(&self) -> &str;

    /// Execute one shell command remotely and capture its output
    async fn exec(&self, command: &str) -> Result<ExecOutput>;

    /// Release the session
    async fn close(&self) -> Result<()>;
}

/// A scoped execution context against the compute marketplace
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Negotiate a provider and open a remote session.
    ///
    /// Surfaces `Error::ProviderTimeout` when no allow-listed provider
    /// picks the task up within the configured deadline.
    async fn acquire(&self) -> Result<Box<dyn TaskSession>>;

    /// Release everything the executor holds. Idempotent.
    async fn shutdown(&self) -> Result<()>;
}
