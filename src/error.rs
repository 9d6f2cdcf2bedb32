//! Error types for the healthcheck runner
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Exit codes for CLI
//!
//! Timeouts carry their own variants so the runner can classify them
//! without comparing error strings.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for runner operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoError = 200,

    // HTTP/reporting errors (3xx)
    HttpFailed = 300,
    ReportRejected = 301,

    // Execution errors (5xx)
    SessionCreateFailed = 500,
    ExecFailed = 501,
    ProviderTimeout = 502,
    ExecTimeout = 503,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            300..=399 => 30, // Reporting errors
            500..=599 => 50, // Execution errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for the runner
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // HTTP/Reporting Errors
    // ─────────────────────────────────────────────────────────────

    /// An outbound HTTP call (status backend or daemon) never completed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The status backend answered with a non-2xx response
    #[error("Status backend rejected report ({status}): {message}")]
    ReportRejected { status: u16, message: String },

    // ─────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────

    /// Session creation against the marketplace daemon failed
    #[error("Failed to create task session: {message}")]
    SessionCreate { message: String },

    /// Remote command execution failed
    #[error("Remote command failed: {message}")]
    ExecFailed { message: String },

    /// No provider accepted the task within the deadline
    #[error("Timed out waiting for a provider after {waited_secs}s")]
    ProviderTimeout { waited_secs: u64 },

    /// The remote command did not finish within the deadline
    #[error("Remote command timed out after {waited_secs}s")]
    ExecTimeout { waited_secs: u64 },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse(_) => ErrorCode::ConfigParseError,
            Error::Config(_) => ErrorCode::ConfigValidation,
            Error::Toml(_) => ErrorCode::ConfigParseError,

            Error::Io(_) => ErrorCode::IoError,

            Error::Http(_) => ErrorCode::HttpFailed,
            Error::ReportRejected { .. } => ErrorCode::ReportRejected,

            Error::SessionCreate { .. } => ErrorCode::SessionCreateFailed,
            Error::ExecFailed { .. } => ErrorCode::ExecFailed,
            Error::ProviderTimeout { .. } => ErrorCode::ProviderTimeout,
            Error::ExecTimeout { .. } => ErrorCode::ExecTimeout,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Whether this error is a timeout from the execution backend.
    ///
    /// The runner maps these to the "unable to reach your provider" status
    /// instead of the generic error status.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::ProviderTimeout { .. } | Error::ExecTimeout { .. }
        )
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'healthcheck-runner config init' to create a default configuration file."
            ),
            Error::ConfigParse(_) => Some(
                "Check your configuration file syntax. Run 'healthcheck-runner config validate' to see details."
            ),
            Error::Config(_) => Some(
                "Review the configuration file and fix the invalid values."
            ),
            Error::Http(_) => Some(
                "Check that the stats backend and the marketplace daemon are reachable from this host."
            ),
            Error::SessionCreate { .. } => Some(
                "Check that the marketplace daemon is running and its API URL is correct."
            ),
            Error::ProviderTimeout { .. } => Some(
                "The provider may already be computing a task. Retry once it is idle."
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let code = self.code();
        let mut output = format!("\x1b[31mError [{}]\x1b[0m: {}\n", code.as_str(), self);

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors (for ergonomic error creation)
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config validation error
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// Create a session creation error
    pub fn session_create(message: impl Into<String>) -> Self {
        Error::SessionCreate {
            message: message.into(),
        }
    }

    /// Create a remote execution error
    pub fn exec_failed(message: impl Into<String>) -> Self {
        Error::ExecFailed {
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::ConfigNotFound.as_str(), "E100");
        assert_eq!(ErrorCode::ReportRejected.as_str(), "E301");
        assert_eq!(ErrorCode::ProviderTimeout.as_str(), "E502");
    }

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(ErrorCode::ConfigNotFound.exit_code(), 10);
        assert_eq!(ErrorCode::IoError.exit_code(), 20);
        assert_eq!(ErrorCode::HttpFailed.exit_code(), 30);
        assert_eq!(ErrorCode::ExecFailed.exit_code(), 50);
        assert_eq!(ErrorCode::InternalError.exit_code(), 90);
    }

    #[test]
    fn test_timeout_classification() {
        assert!(Error::ProviderTimeout { waited_secs: 90 }.is_timeout());
        assert!(Error::ExecTimeout { waited_secs: 60 }.is_timeout());
        assert!(!Error::exec_failed("boom").is_timeout());
        assert!(!Error::session_create("no funds").is_timeout());
        assert!(!Error::ReportRejected {
            status: 500,
            message: "x".into()
        }
        .is_timeout());
    }

    #[test]
    fn test_error_display() {
        let err = Error::ConfigNotFound {
            path: PathBuf::from("/path/to/runner.toml"),
        };
        assert!(err.to_string().contains("/path/to/runner.toml"));

        let err = Error::ReportRejected {
            status: 400,
            message: "missing taskId".into(),
        };
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("missing taskId"));
    }

    #[test]
    fn test_error_suggestions() {
        let err = Error::ConfigNotFound {
            path: PathBuf::from("/test"),
        };
        assert!(err.suggestion().unwrap().contains("config init"));

        let err = Error::ProviderTimeout { waited_secs: 90 };
        assert!(err.suggestion().is_some());

        assert!(Error::exec_failed("boom").suggestion().is_none());
    }

    #[test]
    fn test_format_for_terminal() {
        let err = Error::ConfigNotFound {
            path: PathBuf::from("/test/runner.toml"),
        };
        let formatted = err.format_for_terminal();

        assert!(formatted.contains("E100"));
        assert!(formatted.contains("\x1b[31m"));
        assert!(formatted.contains("Hint"));
    }
}
