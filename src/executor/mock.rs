//! Scripted executor for tests
//!
//! Lets runner tests exercise every terminal branch (success, wrong
//! output, timeout, other error) without a daemon, and counts shutdown
//! calls so the release-exactly-once property is checkable.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};

use super::{ExecOutput, TaskExecutor, TaskSession};

/// What the scripted executor should do
#[derive(Debug, Clone)]
enum Behavior {
    /// Acquire succeeds; exec yields this stdout
    Output(String),
    /// Acquire times out (no provider picked the task up)
    AcquireTimeout,
    /// Acquire fails with this message
    AcquireError(String),
    /// Acquire succeeds; exec times out
    ExecTimeout,
    /// Acquire succeeds; exec fails with this message
    ExecError(String),
}

#[derive(Default)]
struct MockState {
    shutdown_calls: usize,
    close_calls: usize,
    executed_commands: Vec<String>,
}

/// Scripted implementation of the executor seam
pub struct MockExecutor {
    behavior: Behavior,
    state: Arc<Mutex<MockState>>,
}

impl MockExecutor {
    /// Executor whose remote command prints the given stdout
    pub fn with_output(stdout: impl Into<String>) -> Self {
        Self::new(Behavior::Output(stdout.into()))
    }

    /// Executor that never finds a provider
    pub fn acquire_timeout() -> Self {
        Self::new(Behavior::AcquireTimeout)
    }

    /// Executor whose acquisition fails outright
    pub fn acquire_error(message: impl Into<String>) -> Self {
        Self::new(Behavior::AcquireError(message.into()))
    }

    /// Executor whose remote command times out
    pub fn exec_timeout() -> Self {
        Self::new(Behavior::ExecTimeout)
    }

    /// Executor whose remote command fails
    pub fn exec_error(message: impl Into<String>) -> Self {
        Self::new(Behavior::ExecError(message.into()))
    }

    fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// How many times shutdown() was called
    pub fn shutdown_calls(&self) -> usize {
        self.state.lock().shutdown_calls
    }

    /// How many times a session was closed
    pub fn close_calls(&self) -> usize {
        self.state.lock().close_calls
    }

    /// Commands executed through sessions, in order
    pub fn executed_commands(&self) -> Vec<String> {
        self.state.lock().executed_commands.clone()
    }
}

#[async_trait]
impl TaskExecutor for MockExecutor {
    async fn acquire(&self) -> Result<Box<dyn TaskSession>> {
        let session_behavior = match &self.behavior {
            Behavior::AcquireTimeout => {
                return Err(Error::ProviderTimeout { waited_secs: 90 });
            }
            Behavior::AcquireError(message) => {
                return Err(Error::session_create(message.clone()));
            }
            other => other.clone(),
        };

        Ok(Box::new(MockSession {
            behavior: session_behavior,
            state: self.state.clone(),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        self.state.lock().shutdown_calls += 1;
        Ok(())
    }
}

struct MockSession {
    behavior: Behavior,
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl TaskSession for MockSession {
    fn provider_id(&self) -> &str {
        "0xmockprovider"
    }

    async fn exec(&self, command: &str) -> Result<ExecOutput> {
        self.state.lock().executed_commands.push(command.to_string());

        match &self.behavior {
            Behavior::Output(stdout) => Ok(ExecOutput {
                stdout: stdout.clone(),
                stderr: String::new(),
                exit_code: 0,
            }),
            Behavior::ExecTimeout => Err(Error::ExecTimeout { waited_secs: 120 }),
            Behavior::ExecError(message) => Err(Error::exec_failed(message.clone())),
            _ => unreachable!("acquire() never builds a session for these behaviors"),
        }
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().close_calls += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_output_round_trip() {
        let executor = MockExecutor::with_output("4");
        let session = executor.acquire().await.unwrap();
        let output = session.exec("echo -n $((2+2))").await.unwrap();

        assert_eq!(output.stdout, "4");
        assert_eq!(output.exit_code, 0);
        assert_eq!(executor.executed_commands(), vec!["echo -n $((2+2))"]);

        session.close().await.unwrap();
        executor.shutdown().await.unwrap();
        assert_eq!(executor.close_calls(), 1);
        assert_eq!(executor.shutdown_calls(), 1);
    }

    #[tokio::test]
    async fn test_acquire_timeout_is_tagged() {
        let executor = MockExecutor::acquire_timeout();
        let err = executor.acquire().await.err().unwrap();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_exec_error_is_not_timeout() {
        let executor = MockExecutor::exec_error("out of disk");
        let session = executor.acquire().await.unwrap();
        let err = session.exec("true").await.err().unwrap();
        assert!(!err.is_timeout());
        assert!(err.to_string().contains("out of disk"));
    }
}
