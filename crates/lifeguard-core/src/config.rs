use std::env;
use std::time::Duration;

use crate::error::OrchestratorError;

const DEFAULT_SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound on the whole stop cascade. Once it elapses the manager
    /// gives up and returns; still-running services are not killed.
    pub shutdown_deadline: Duration,
    /// Log level (e.g., trace, debug, info, warn, error), handed to the
    /// host's subscriber setup.
    pub log_level: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            shutdown_deadline: DEFAULT_SHUTDOWN_DEADLINE,
            log_level: "info".to_string(),
        }
    }
}

impl OrchestratorConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, OrchestratorError> {
        let shutdown_deadline = env::var("LIFEGUARD_SHUTDOWN_DEADLINE_SECS")
            .ok()
            .and_then(|secs| secs.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SHUTDOWN_DEADLINE);
        let log_level = env::var("LIFEGUARD_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|_| "info".to_string());

        let config = Self {
            shutdown_deadline,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.shutdown_deadline.is_zero() {
            return Err(OrchestratorError::InvalidConfig(
                "shutdown deadline must be greater than zero".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(OrchestratorError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }
}
