//! Execution backend seam
//!
//! The runner only ever talks to the marketplace through the traits here:
//! acquire a session, run one command, release everything. `RestExecutor`
//! drives the local daemon's REST API; the scripted mock lives behind
//! `cfg(test)`.

#[cfg(test)]
pub mod mock;
pub mod rest;
mod traits;

pub use rest::RestExecutor;
pub use traits::{ExecOutput, TaskExecutor, TaskSession};
