// SPDX-License-Identifier: MIT OR Apache-2.0
//! Daemon configuration: TOML loading, defaulting, validation.

use axum::http::StatusCode;
use gantry_error::AppEnv;
use gantry_health::HealthCheckOptions;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found or unreadable.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaemonConfig {
    /// Bind address (`host:port`).
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Deployment environment driving error-output redaction.
    #[serde(default)]
    pub env: AppEnv,

    /// Log filter override (e.g. `"debug"`, `"gantry=info"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Health endpoint response shaping.
    #[serde(default)]
    pub health: HealthSettings,

    /// CORS configuration.
    #[serde(default)]
    pub cors: CorsSettings,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            env: AppEnv::default(),
            log_level: Some("info".into()),
            health: HealthSettings::default(),
            cors: CorsSettings::default(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8088".into()
}

/// Status-code overrides for the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthSettings {
    /// Status answered when every probe passes.
    #[serde(default = "default_healthy_status")]
    pub healthy_status_code: u16,
    /// Status answered when a probe fails.
    #[serde(default = "default_unhealthy_status")]
    pub unhealthy_status_code: u16,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            healthy_status_code: default_healthy_status(),
            unhealthy_status_code: default_unhealthy_status(),
        }
    }
}

fn default_healthy_status() -> u16 {
    200
}

fn default_unhealthy_status() -> u16 {
    503
}

/// CORS origins allowed to call the daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorsSettings {
    /// Allowed origins; an empty list disables the CORS layer.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl DaemonConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let config: Self = toml::from_str(&raw).map_err(|err| ConfigError::ParseError {
            reason: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check semantic constraints: parseable bind address, status codes in
    /// the valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut reasons = Vec::new();

        if self.bind.parse::<SocketAddr>().is_err() {
            reasons.push(format!("bind address `{}` is not host:port", self.bind));
        }
        for (field, code) in [
            ("health.healthy_status_code", self.health.healthy_status_code),
            (
                "health.unhealthy_status_code",
                self.health.unhealthy_status_code,
            ),
        ] {
            if StatusCode::from_u16(code).is_err() {
                reasons.push(format!("{field} `{code}` is not a valid HTTP status"));
            }
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError { reasons })
        }
    }

    /// Translate the health settings into aggregator options.
    ///
    /// Assumes [`validate`](Self::validate) passed; out-of-range codes fall
    /// back to the defaults.
    pub fn health_options(&self) -> HealthCheckOptions {
        HealthCheckOptions {
            healthy_status_code: StatusCode::from_u16(self.health.healthy_status_code)
                .unwrap_or(StatusCode::OK),
            unhealthy_status_code: StatusCode::from_u16(self.health.unhealthy_status_code)
                .unwrap_or(StatusCode::SERVICE_UNAVAILABLE),
            default_response: json!({"ok": 1}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = DaemonConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind, "127.0.0.1:8088");
        assert_eq!(config.env, AppEnv::Development);
        assert_eq!(config.health.healthy_status_code, 200);
        assert_eq!(config.health.unhealthy_status_code, 503);
    }

    #[test]
    fn load_reads_a_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
bind = "0.0.0.0:9000"
env = "production"

[health]
healthy_status_code = 204

[cors]
allowed_origins = ["https://example.com"]
"#
        )
        .unwrap();

        let config = DaemonConfig::load(file.path()).unwrap();
        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.env, AppEnv::Production);
        assert_eq!(config.health.healthy_status_code, 204);
        assert_eq!(config.health.unhealthy_status_code, 503);
        assert_eq!(config.cors.allowed_origins, vec!["https://example.com"]);
    }

    #[test]
    fn load_reports_missing_files() {
        let err = DaemonConfig::load(Path::new("/nonexistent/gantry.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn load_reports_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind = [not toml").unwrap();
        let err = DaemonConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn validate_rejects_bad_bind_and_status() {
        let config = DaemonConfig {
            bind: "not-an-address".into(),
            health: HealthSettings {
                healthy_status_code: 42,
                unhealthy_status_code: 503,
            },
            ..DaemonConfig::default()
        };
        let err = config.validate().unwrap_err();
        match err {
            ConfigError::ValidationError { reasons } => {
                assert_eq!(reasons.len(), 2);
                assert!(reasons[0].contains("not-an-address"));
                assert!(reasons[1].contains("42"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn health_options_reflect_overrides() {
        let config = DaemonConfig {
            health: HealthSettings {
                healthy_status_code: 204,
                unhealthy_status_code: 500,
            },
            ..DaemonConfig::default()
        };
        let options = config.health_options();
        assert_eq!(options.healthy_status_code, StatusCode::NO_CONTENT);
        assert_eq!(
            options.unhealthy_status_code,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(options.default_response, json!({"ok": 1}));
    }
}
