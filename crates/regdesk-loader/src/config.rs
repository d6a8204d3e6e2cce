//! Loader configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default deadline for a single load attempt.
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Configuration for a [`GuardedLoader`](crate::GuardedLoader).
///
/// Fixed for the lifetime of a loader. Deserializes with defaults for every
/// missing field, so an empty `[loader]` table is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Deadline for one attempt, in milliseconds.
    pub timeout_ms: u64,
    /// Start a load on creation and on every dependency key change.
    pub auto_load: bool,
    /// Name used in logs and metrics.
    pub label: String,
}

impl LoaderConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attempt deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the attempt deadline in milliseconds.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set whether loads start automatically.
    pub fn with_auto_load(mut self, auto_load: bool) -> Self {
        self.auto_load = auto_load;
        self
    }

    /// Set the label used in logs.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Get the attempt deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Check the configuration for values a loader cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.label.trim().is_empty() {
            return Err(ConfigError::EmptyLabel);
        }
        Ok(())
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            auto_load: true,
            label: "loader".to_string(),
        }
    }
}

/// Invalid loader configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("label must not be empty")]
    EmptyLabel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(15));
        assert!(config.auto_load);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: LoaderConfig = serde_json::from_str(r#"{"timeout_ms": 250}"#).unwrap();
        assert_eq!(config.timeout_ms, 250);
        assert!(config.auto_load);
        assert_eq!(config.label, "loader");
    }

    #[test]
    fn test_builder_methods() {
        let config = LoaderConfig::new()
            .with_timeout(Duration::from_millis(40))
            .with_auto_load(false)
            .with_label("payments");
        assert_eq!(config.timeout_ms, 40);
        assert!(!config.auto_load);
        assert_eq!(config.label, "payments");
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = LoaderConfig::new().with_timeout_ms(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn test_validate_rejects_blank_label() {
        let config = LoaderConfig::new().with_label("  ");
        assert_eq!(config.validate(), Err(ConfigError::EmptyLabel));
    }
}
