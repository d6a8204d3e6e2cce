//! CLI configuration.

use anyhow::{Context, Result};
use regdesk_loader::LoaderConfig;
use regdesk_observability::LogConfig;
use serde::{Deserialize, Serialize};

use crate::backend::FailureMode;

/// File names searched for, in order, in each directory.
pub const CONFIG_NAMES: [&str; 3] = ["regdesk.toml", ".regdesk.toml", "regdesk.json"];

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Loader settings.
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LogConfig,

    /// Simulated backend settings.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        Self::parse(path, &content)
    }

    /// Parse config content, choosing the format from the file extension.
    pub fn parse(path: &str, content: &str) -> Result<Self> {
        if path.ends_with(".json") {
            serde_json::from_str(content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            toml::from_str(content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }

    /// Check the configuration, returning (errors, warnings).
    pub fn validate(&self) -> (Vec<String>, Vec<String>) {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if let Err(e) = self.loader.validate() {
            errors.push(format!("loader: {}", e));
        }

        if let Err(e) = self.logging.env_filter() {
            errors.push(format!("logging: {}", e));
        }

        if self.loader.timeout_ms < 1_000 {
            warnings.push(format!(
                "loader.timeout_ms = {} is shorter than typical query latency",
                self.loader.timeout_ms
            ));
        }

        if self.simulation.rows == 0 {
            warnings.push("simulation.rows = 0 produces empty result sets".to_string());
        }

        if self.simulation.failure != FailureMode::None && self.simulation.fail_after.is_none() {
            warnings.push(format!(
                "simulation.failure = {} with no fail_after: every attempt fails",
                self.simulation.failure
            ));
        }

        (errors, warnings)
    }
}

/// Simulated participants backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Latency of every query, in milliseconds.
    pub latency_ms: u64,
    /// Number of participant rows returned.
    pub rows: usize,
    /// How queries fail once failing starts.
    pub failure: FailureMode,
    /// Number of queries that succeed before failures start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_after: Option<usize>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            latency_ms: 300,
            rows: 5,
            failure: FailureMode::None,
            fail_after: None,
        }
    }
}

/// Generate a default regdesk.toml config file.
pub fn generate_default_config() -> String {
    r#"# RegDesk loader configuration

[loader]
label = "participants"
timeout_ms = 15000
auto_load = true

[logging]
level = "info"
format = "human"
# directives = ["regdesk_loader=debug"]

[simulation]
latency_ms = 300
rows = 5
failure = "none"
# fail_after = 1
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use regdesk_observability::{LogFormat, LogLevel};

    #[test]
    fn test_default_config_parses() {
        let config = CliConfig::parse("regdesk.toml", &generate_default_config()).unwrap();
        assert_eq!(config.loader.label, "participants");
        assert_eq!(config.loader.timeout_ms, 15_000);
        assert!(config.loader.auto_load);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.format, LogFormat::Human);
        assert_eq!(config.simulation, SimulationConfig::default());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = CliConfig::parse("regdesk.toml", &generate_default_config()).unwrap();
        let (errors, warnings) = config.validate();
        assert!(errors.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = CliConfig::parse("regdesk.toml", "").unwrap();
        assert_eq!(config.loader, LoaderConfig::default());
        assert_eq!(config.logging, LogConfig::default());
    }

    #[test]
    fn test_json_config() {
        let config = CliConfig::parse(
            "regdesk.json",
            r#"{"loader": {"timeout_ms": 2000}, "simulation": {"failure": "transport", "fail_after": 2}}"#,
        )
        .unwrap();
        assert_eq!(config.loader.timeout_ms, 2_000);
        assert_eq!(config.simulation.failure, FailureMode::Transport);
        assert_eq!(config.simulation.fail_after, Some(2));
    }

    #[test]
    fn test_validate_reports_errors_and_warnings() {
        let config = CliConfig::parse(
            "regdesk.toml",
            r#"
[loader]
timeout_ms = 0

[simulation]
failure = "operation"
"#,
        )
        .unwrap();
        let (errors, warnings) = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("timeout_ms"));
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_invalid_toml_has_context() {
        let err = CliConfig::parse("broken.toml", "[loader\n").unwrap_err();
        assert!(format!("{:#}", err).contains("broken.toml"));
    }
}
