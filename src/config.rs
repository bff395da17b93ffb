use crate::heartbeat;
use crate::interpreter::ScreenshotFlagPolicy;
use crate::paths;
use crate::protocol::ClientKind;
use crate::screenshot::Bound;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Overrides `token` from the environment.
pub const TOKEN_ENV: &str = "SESSION_TELEMETRY_TOKEN";
/// Overrides `server` from the environment.
pub const SERVER_ENV: &str = "SESSION_TELEMETRY_SERVER";

pub const DEFAULT_SERVER: &str = "https://occode.io/services";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Base URL the endpoint paths are appended to.
    #[serde(default = "default_server")]
    pub server: String,
    /// Developer token. Usually supplied via CLI or environment instead.
    #[serde(default)]
    pub token: Option<String>,
    /// Bot framework family the session reports as.
    #[serde(default)]
    pub client: ClientKind,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Screenshot canvas. Defaults per client family when absent.
    #[serde(default)]
    pub screenshot: Option<Bound>,
    #[serde(default)]
    pub screenshot_flag: ScreenshotFlagPolicy,
}

fn default_server() -> String {
    DEFAULT_SERVER.to_string()
}

fn default_heartbeat_interval_ms() -> u64 {
    heartbeat::DEFAULT_PERIOD.as_millis() as u64
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            token: None,
            client: ClientKind::default(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            screenshot: None,
            screenshot_flag: ScreenshotFlagPolicy::default(),
        }
    }
}

impl TelemetryConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file as YAML: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the effective configuration.
    ///
    /// An explicit path must exist. Otherwise `~/.session-telemetry/config.yaml`
    /// is used when present, falling back to built-in defaults. Environment
    /// overrides are applied last.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => {
                let user_config = paths::config_path()?;
                if user_config.exists() {
                    Self::load(&user_config)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(token) = non_empty_env(TOKEN_ENV) {
            self.token = Some(token);
        }
        if let Some(server) = non_empty_env(SERVER_ENV) {
            self.server = server;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            anyhow::bail!("Server URL must not be empty");
        }
        if self.heartbeat_interval_ms == 0 {
            anyhow::bail!("heartbeat_interval_ms must be greater than zero");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than zero");
        }
        if let Some(bound) = self.screenshot {
            if bound.max_width == 0 || bound.max_height == 0 {
                anyhow::bail!(
                    "Screenshot bound must be non-zero, got {}x{}",
                    bound.max_width,
                    bound.max_height
                );
            }
        }
        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Screenshot canvas for sessions of the given family.
    pub fn screenshot_bound(&self, kind: ClientKind) -> Bound {
        self.screenshot
            .unwrap_or_else(|| kind.default_screenshot_bound())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
