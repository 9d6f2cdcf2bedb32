//! Health check run orchestration
//!
//! One run is a single attempt, terminal on its first error or success:
//! report that the market is being scanned, acquire a session on the
//! allow-listed provider, run the probe command, classify stdout, and
//! report the outcome. The executor is shut down exactly once on every
//! exit path. All status strings are part of the wire contract with the
//! stats backend and must not be reworded.

use tracing::{error, info, warn};

use crate::error::Error;
use crate::executor::TaskExecutor;
use crate::report::StatusSink;

/// Probe command run on the rented provider
pub const PROBE_COMMAND: &str = "echo -n $((2+2))";

/// Expected stdout of the probe command
pub const EXPECTED_OUTPUT: &str = "4";

/// Milestone: market scan started
pub const STATUS_SEARCHING: &str = "Scanning the market for your provider...";

/// Milestone: provider negotiated, task starting
pub const STATUS_STARTING: &str = "We found your provider. The task is now starting...";

/// Terminal: probe output matched
pub const STATUS_SUCCESS: &str =
    "Task completely successfully. The provider appears to be working as intended.";

/// Terminal: probe ran but produced the wrong output
pub const STATUS_COMPUTE_FAILED: &str = "The task failed to compute.";

/// Terminal: no provider reachable within the deadline
pub const STATUS_TIMEOUT: &str =
    "We were unable to reach your provider, please make sure you're not already computing a task.";

/// Terminal state of one health check run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Probe ran and printed the expected output
    Succeeded,
    /// Probe ran but printed something else
    ComputeFailed,
    /// The execution backend timed out
    TimedOut,
    /// Any other execution error
    Errored,
}

/// Run one health check against the given executor, narrating every
/// milestone into the sink.
///
/// Report failures are logged and swallowed here; they never abort the
/// run. A completed run, whatever its outcome, is not a process error.
pub async fn run(
    executor: &dyn TaskExecutor,
    sink: &dyn StatusSink,
    task_id: &str,
) -> RunOutcome {
    report(sink, task_id, STATUS_SEARCHING).await;

    let outcome = match probe(executor, sink, task_id).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_timeout() => {
            info!(task_id, error = %e, "Run timed out");
            report(sink, task_id, STATUS_TIMEOUT).await;
            RunOutcome::TimedOut
        }
        Err(e) => {
            error!(task_id, error = %e, "Run failed");
            report(sink, task_id, &format!("Error running task, reason: {}", e)).await;
            RunOutcome::Errored
        }
    };

    // Every exit path above converges here; shutdown happens exactly once
    if let Err(e) = executor.shutdown().await {
        warn!(task_id, error = %e, "Executor shutdown failed");
    }

    outcome
}

/// Acquire a session, run the probe and classify its output
async fn probe(
    executor: &dyn TaskExecutor,
    sink: &dyn StatusSink,
    task_id: &str,
) -> Result<RunOutcome, Error> {
    let session = executor.acquire().await?;
    info!(task_id, provider_id = %session.provider_id(), "Provider found");
    report(sink, task_id, STATUS_STARTING).await;

    let result = session.exec(PROBE_COMMAND).await;

    // Release the session on both the success and the error path
    if let Err(e) = session.close().await {
        warn!(task_id, error = %e, "Session close failed");
    }

    let output = result?;
    if output.stdout == EXPECTED_OUTPUT {
        info!(task_id, "Probe output matched");
        report(sink, task_id, STATUS_SUCCESS).await;
        Ok(RunOutcome::Succeeded)
    } else {
        warn!(
            task_id,
            stdout = %output.stdout,
            exit_code = output.exit_code,
            "Probe produced unexpected output"
        );
        report(sink, task_id, STATUS_COMPUTE_FAILED).await;
        Ok(RunOutcome::ComputeFailed)
    }
}

/// Fire-and-forget milestone report: failures are logged, never propagated
async fn report(sink: &dyn StatusSink, task_id: &str, status: &str) {
    if let Err(e) = sink.submit(task_id, status).await {
        error!(task_id, status, error = %e, "Failed to submit status report");
    }
}
