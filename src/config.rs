//! Configuration system for the healthcheck runner
//!
//! Supports multiple configuration sources with the following precedence
//! (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (HEALTHCHECK_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// Main runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Status reporter settings
    pub reporter: ReporterSettings,

    /// Marketplace executor settings
    pub executor: ExecutorSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Status reporter settings
///
/// One reporter, one base URL. When no explicit URL is configured the
/// historical `DOCKER=true` convention picks the in-cluster hostname over
/// the local alias.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterSettings {
    /// Explicit base URL of the stats backend (overrides the DOCKER switch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Base URL used when DOCKER=true and no explicit URL is set
    pub docker_base_url: String,

    /// Base URL used outside docker when no explicit URL is set
    pub local_base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Marketplace executor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Base URL of the local marketplace daemon API
    pub api_url: String,

    /// Workload image to rent providers with
    pub image: String,

    /// Budget ceiling for the run, in the network's token
    pub budget: String,

    /// How long to wait for a provider to pick up the task, in seconds
    pub provider_wait_secs: u64,

    /// How long to wait for the remote command to finish, in seconds
    pub exec_timeout_secs: u64,

    /// Interval between state polls, in milliseconds
    pub poll_interval_ms: u64,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// Default implementations

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            reporter: ReporterSettings::default(),
            executor: ExecutorSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for ReporterSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            docker_base_url: "http://webserver:8002".to_string(),
            local_base_url: "http://api.localhost".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:7465".to_string(),
            image: "golem/alpine:latest".to_string(),
            budget: "0.000001".to_string(),
            provider_wait_secs: 90,
            exec_timeout_secs: 120,
            poll_interval_ms: 1000,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_files: 5,
            json_format: false,
        }
    }
}

impl ReporterSettings {
    /// Resolve the base URL to report against, once at startup.
    pub fn resolved_base_url(&self) -> String {
        if let Some(ref url) = self.base_url {
            return url.trim_end_matches('/').to_string();
        }
        let in_docker = std::env::var("DOCKER")
            .map(|v| v == "true")
            .unwrap_or(false);
        if in_docker {
            self.docker_base_url.trim_end_matches('/').to_string()
        } else {
            self.local_base_url.trim_end_matches('/').to_string()
        }
    }
}

impl RunnerConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path)?;
            config = toml::from_str(&content)?;
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides();

        // 3. Expand paths
        config.expand_paths();

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let expanded = shellexpand::tilde(path);
            let path = PathBuf::from(expanded.as_ref());
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::ConfigNotFound { path });
        }

        // Search in standard locations
        let search_paths = [
            // Current directory
            PathBuf::from("healthcheck-runner.toml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("healthcheck-runner").join("runner.toml"))
                .unwrap_or_default(),
            // System config (Linux)
            PathBuf::from("/etc/healthcheck-runner/runner.toml"),
        ];

        for path in &search_paths {
            if path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Reporter settings
        if let Ok(val) = std::env::var("HEALTHCHECK_REPORT_URL") {
            self.reporter.base_url = Some(val);
        }
        if let Ok(val) = std::env::var("HEALTHCHECK_REPORT_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                self.reporter.timeout_secs = n;
            }
        }

        // Executor settings
        if let Ok(val) = std::env::var("HEALTHCHECK_EXECUTOR_API_URL") {
            self.executor.api_url = val;
        }
        if let Ok(val) = std::env::var("HEALTHCHECK_IMAGE") {
            self.executor.image = val;
        }
        if let Ok(val) = std::env::var("HEALTHCHECK_BUDGET") {
            self.executor.budget = val;
        }
        if let Ok(val) = std::env::var("HEALTHCHECK_PROVIDER_WAIT_SECS") {
            if let Ok(n) = val.parse() {
                self.executor.provider_wait_secs = n;
            }
        }
        if let Ok(val) = std::env::var("HEALTHCHECK_EXEC_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                self.executor.exec_timeout_secs = n;
            }
        }

        // Logging settings
        if let Ok(val) = std::env::var("HEALTHCHECK_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("HEALTHCHECK_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("HEALTHCHECK_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Expand ~ in paths
    fn expand_paths(&mut self) {
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(
                shellexpand::full(file)
                    .unwrap_or_else(|_| std::borrow::Cow::Borrowed(file))
                    .into_owned(),
            );
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate URLs
        for (name, value) in [
            ("executor.api_url", &self.executor.api_url),
            ("reporter.docker_base_url", &self.reporter.docker_base_url),
            ("reporter.local_base_url", &self.reporter.local_base_url),
        ] {
            Url::parse(value)
                .map_err(|e| Error::config(format!("Invalid URL for {}: {}", name, e)))?;
        }
        if let Some(ref url) = self.reporter.base_url {
            Url::parse(url)
                .map_err(|e| Error::config(format!("Invalid URL for reporter.base_url: {}", e)))?;
        }

        // Validate budget
        let budget: f64 = self
            .executor
            .budget
            .parse()
            .map_err(|_| Error::config(format!("Invalid budget '{}'", self.executor.budget)))?;
        if budget <= 0.0 {
            return Err(Error::config("Budget must be positive"));
        }

        if self.executor.image.is_empty() {
            return Err(Error::config("Workload image cannot be empty"));
        }
        if self.executor.poll_interval_ms == 0 {
            return Err(Error::config("poll_interval_ms must be nonzero"));
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<()> {
    let config_path = path
        .map(|p| {
            PathBuf::from(
                shellexpand::tilde(p).into_owned(),
            )
        })
        .or_else(|| dirs::config_dir().map(|p| p.join("healthcheck-runner").join("runner.toml")))
        .ok_or_else(|| Error::config("Cannot determine config directory"))?;

    if config_path.exists() && !force {
        return Err(Error::config(format!(
            "Configuration file already exists: {} (use --force to overwrite)",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = format!(
        "# healthcheck-runner configuration\n\n{}",
        toml::to_string_pretty(&RunnerConfig::default())?
    );
    fs::write(&config_path, content)?;

    println!("Configuration written to {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = RunnerConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.executor.image, "golem/alpine:latest");
        assert_eq!(config.executor.budget, "0.000001");
        assert_eq!(config.executor.api_url, "http://127.0.0.1:7465");
        assert_eq!(config.logging.level, "info");
        assert!(config.reporter.base_url.is_none());
    }

    #[test]
    fn test_explicit_base_url_wins() {
        let settings = ReporterSettings {
            base_url: Some("http://stats.example.com/".to_string()),
            ..Default::default()
        };
        assert_eq!(settings.resolved_base_url(), "http://stats.example.com");
    }

    #[test]
    fn test_toml_round_trip() {
        let config = RunnerConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: RunnerConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.executor.image, config.executor.image);
        assert_eq!(parsed.reporter.local_base_url, config.reporter.local_base_url);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: RunnerConfig = toml::from_str(
            r#"
            [executor]
            budget = "0.5"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.executor.budget, "0.5");
        assert_eq!(parsed.executor.image, "golem/alpine:latest");
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn test_invalid_budget_rejected() {
        let mut config = RunnerConfig::default();
        config.executor.budget = "free".to_string();
        assert!(config.validate().is_err());

        config.executor.budget = "-1".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_url_rejected() {
        let mut config = RunnerConfig::default();
        config.executor.api_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = RunnerConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let result = RunnerConfig::load(Some("/nonexistent/runner.toml"));
        assert!(matches!(result, Err(Error::ConfigNotFound { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("runner.toml");
        std::fs::write(
            &path,
            r#"
            [reporter]
            base_url = "http://stats.internal:8002"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        let config = RunnerConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(
            config.reporter.base_url.as_deref(),
            Some("http://stats.internal:8002")
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_init_config_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("runner.toml");
        init_config(Some(path.to_str().unwrap()), false).unwrap();
        assert!(path.exists());

        let second = init_config(Some(path.to_str().unwrap()), false);
        assert!(second.is_err());

        // --force overwrites
        init_config(Some(path.to_str().unwrap()), true).unwrap();
    }
}
