// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! Operator configuration from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `AVAGO_OPERATOR_ROLLOUT_TIMEOUT_SECS` | 30 |
//! | `AVAGO_OPERATOR_REQUEUE_SECS` | 5 |
//! | `AVAGO_OPERATOR_INVALID_REQUEUE_SECS` | 300 |
//! | `AVAGO_OPERATOR_WATCH_NAMESPACE` | all namespaces |
//! | `AVAGO_OPERATOR_LOG_FORMAT` | `json` |

use std::time::Duration;

use thiserror::Error;

pub const ROLLOUT_TIMEOUT_VAR: &str = "AVAGO_OPERATOR_ROLLOUT_TIMEOUT_SECS";
pub const REQUEUE_VAR: &str = "AVAGO_OPERATOR_REQUEUE_SECS";
pub const INVALID_REQUEUE_VAR: &str = "AVAGO_OPERATOR_INVALID_REQUEUE_SECS";
pub const WATCH_NAMESPACE_VAR: &str = "AVAGO_OPERATOR_WATCH_NAMESPACE";
pub const LOG_FORMAT_VAR: &str = "AVAGO_OPERATOR_LOG_FORMAT";

/// Longest accepted delay, one day.
pub const MAX_DELAY_SECS: u64 = 86_400;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a whole number of seconds, got {value:?}")]
    NotANumber { var: &'static str, value: String },

    #[error("{var} must be between 1 and {max} seconds, got {value}")]
    OutOfRange { var: &'static str, value: u64, max: u64 },

    #[error("{LOG_FORMAT_VAR} must be 'json' or 'pretty', got {0:?}")]
    UnknownLogFormat(String),

    #[error("{WATCH_NAMESPACE_VAR} must not be blank")]
    BlankNamespace,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            _ => Err(ConfigError::UnknownLogFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Bound on each StatefulSet rollout wait.
    pub rollout_timeout: Duration,
    /// Delay before retrying a pass that failed for a transient reason.
    pub requeue_after: Duration,
    /// Delay before retrying a pass rejected for invalid input.
    pub invalid_requeue_after: Duration,
    /// Restrict the controller to one namespace.
    pub watch_namespace: Option<String>,
    pub log_format: LogFormat,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            rollout_timeout: Duration::from_secs(30),
            requeue_after: Duration::from_secs(5),
            invalid_requeue_after: Duration::from_secs(300),
            watch_namespace: None,
            log_format: LogFormat::Json,
        }
    }
}

impl OperatorConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Unset or empty values keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(value) = get(ROLLOUT_TIMEOUT_VAR) {
            config.rollout_timeout = parse_secs(ROLLOUT_TIMEOUT_VAR, &value)?;
        }
        if let Some(value) = get(REQUEUE_VAR) {
            config.requeue_after = parse_secs(REQUEUE_VAR, &value)?;
        }
        if let Some(value) = get(INVALID_REQUEUE_VAR) {
            config.invalid_requeue_after = parse_secs(INVALID_REQUEUE_VAR, &value)?;
        }
        if let Some(value) = get(WATCH_NAMESPACE_VAR) {
            let namespace = value.trim();
            if namespace.is_empty() {
                return Err(ConfigError::BlankNamespace);
            }
            config.watch_namespace = Some(namespace.to_string());
        }
        if let Some(value) = get(LOG_FORMAT_VAR) {
            config.log_format = value.parse()?;
        }
        Ok(config)
    }

    /// Human-readable listing for `config show`.
    pub fn describe(&self) -> String {
        format!(
            "{}={}\n{}={}\n{}={}\n{}={}\n{}={}\n",
            ROLLOUT_TIMEOUT_VAR,
            self.rollout_timeout.as_secs(),
            REQUEUE_VAR,
            self.requeue_after.as_secs(),
            INVALID_REQUEUE_VAR,
            self.invalid_requeue_after.as_secs(),
            WATCH_NAMESPACE_VAR,
            self.watch_namespace.as_deref().unwrap_or("<all>"),
            LOG_FORMAT_VAR,
            self.log_format,
        )
    }
}

fn parse_secs(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::NotANumber { var, value: value.to_string() })?;
    if secs == 0 || secs > MAX_DELAY_SECS {
        return Err(ConfigError::OutOfRange { var, value: secs, max: MAX_DELAY_SECS });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
