//! Configuration loading and validation for faultline.
//!
//! This module handles loading the YAML configuration file, validation,
//! and environment variable substitution for endpoint URLs and secrets.

mod env;
mod secret;

pub use env::resolve_env_vars;
pub use secret::SecretString;

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable consulted for the default server identity.
pub const ENV_SERVER_NAME: &str = "HOSTNAME";

/// Main configuration structure for faultline.
///
/// Transport mode is selected by presence of the `remote` section: when it
/// is set the client serializes and POSTs events to the configured
/// collectors; when absent, events go to the local grouped-message store.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Remote collector settings. Absent means local mode.
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
    /// Burst-suppression settings. Absent (or zero window/limit) disables
    /// the thrashing limiter entirely.
    #[serde(default)]
    pub thrashing: Option<ThrashingConfig>,
    /// Process-wide identity stamped onto events that lack a server name.
    #[serde(default = "default_server_name")]
    pub server_name: String,
}

/// Remote collector configuration.
#[derive(Debug, Deserialize)]
pub struct RemoteConfig {
    /// Collector endpoint URLs. Every endpoint receives every event.
    pub endpoints: Vec<String>,
    /// Access credential sent alongside each payload (never logged).
    pub key: SecretString,
    /// Per-request timeout.
    #[serde(with = "humantime_serde", default = "default_remote_timeout")]
    pub timeout: Duration,
}

/// Thrashing limiter configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ThrashingConfig {
    /// Counting window. Zero disables the limiter.
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    /// Allowed occurrences per `(class_name, fingerprint)` key within the
    /// window; occurrences past this count are suppressed. Zero disables
    /// the limiter.
    pub limit: u32,
}

impl ThrashingConfig {
    /// A limiter with a zero window or zero limit is a no-op.
    pub fn is_enabled(&self) -> bool {
        !self.window.is_zero() && self.limit > 0
    }
}

fn default_server_name() -> String {
    std::env::var(ENV_SERVER_NAME).unwrap_or_else(|_| "localhost".to_string())
}

fn default_remote_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Config {
    /// Load configuration from a file path.
    ///
    /// # Errors
    /// Returns [`ConfigError::LoadError`] if the file cannot be read.
    /// Returns [`ConfigError::ValidationError`] if the YAML is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    /// Returns [`ConfigError::ValidationError`] if the YAML is invalid.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Validate the configuration, collecting all errors.
    ///
    /// `${VAR}` placeholders in endpoint URLs and the access key are left
    /// untouched here; they are resolved when the transport is built.
    ///
    /// # Errors
    /// Returns a `Vec<ConfigError>` containing all validation errors found.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        if let Some(ref remote) = self.remote {
            if remote.endpoints.is_empty() {
                errors.push(ConfigError::ValidationError(
                    "remote.endpoints must not be empty".to_string(),
                ));
            }
            for url in &remote.endpoints {
                // Placeholders are resolved later; skip URL parsing for them.
                if url.contains("${") {
                    continue;
                }
                if let Err(e) = reqwest::Url::parse(url) {
                    errors.push(ConfigError::InvalidEndpoint {
                        url: url.clone(),
                        message: e.to_string(),
                    });
                }
            }
            if remote.timeout.is_zero() {
                errors.push(ConfigError::ValidationError(
                    "remote.timeout must be greater than zero".to_string(),
                ));
            }
            if remote.key.expose().is_empty() {
                errors.push(ConfigError::ValidationError(
                    "remote.key must not be empty".to_string(),
                ));
            }
        }

        if let Some(ref thrashing) = self.thrashing {
            if !thrashing.is_enabled() {
                tracing::warn!(
                    window_secs = thrashing.window.as_secs(),
                    limit = thrashing.limit,
                    "Thrashing window or limit is zero, limiter disabled"
                );
            }
        }

        if self.server_name.is_empty() {
            errors.push(ConfigError::ValidationError(
                "server_name must not be empty".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_local_config_parses() {
        let config = Config::from_yaml("server_name: web-01\n").unwrap();
        assert!(config.remote.is_none());
        assert!(config.thrashing.is_none());
        assert_eq!(config.server_name, "web-01");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn remote_config_parses_with_defaults() {
        let yaml = r#"
server_name: web-01
remote:
  endpoints:
    - https://collector.example.com/store/
  key: abc123
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let remote = config.remote.as_ref().unwrap();
        assert_eq!(remote.endpoints.len(), 1);
        assert_eq!(remote.key.expose(), "abc123");
        assert_eq!(remote.timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn thrashing_config_parses_durations() {
        let yaml = r#"
server_name: web-01
thrashing:
  window: 1m
  limit: 10
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let thrashing = config.thrashing.unwrap();
        assert_eq!(thrashing.window, Duration::from_secs(60));
        assert_eq!(thrashing.limit, 10);
        assert!(thrashing.is_enabled());
    }

    #[test]
    fn zero_window_disables_limiter() {
        let thrashing = ThrashingConfig {
            window: Duration::ZERO,
            limit: 10,
        };
        assert!(!thrashing.is_enabled());

        let thrashing = ThrashingConfig {
            window: Duration::from_secs(60),
            limit: 0,
        };
        assert!(!thrashing.is_enabled());
    }

    #[test]
    fn empty_endpoint_list_is_invalid() {
        let yaml = r#"
server_name: web-01
remote:
  endpoints: []
  key: abc123
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let errors = config.validate().unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("endpoints must not be empty")));
    }

    #[test]
    fn malformed_endpoint_url_is_invalid() {
        let yaml = r#"
server_name: web-01
remote:
  endpoints:
    - "not a url"
  key: abc123
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let errors = config.validate().unwrap_err();
        assert!(matches!(errors[0], ConfigError::InvalidEndpoint { .. }));
    }

    #[test]
    fn placeholder_endpoints_skip_url_validation() {
        let yaml = r#"
server_name: web-01
remote:
  endpoints:
    - "${COLLECTOR_URL}/store/"
  key: "${COLLECTOR_KEY}"
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_yaml_is_a_validation_error() {
        let err = Config::from_yaml("remote: [not: a: mapping").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
