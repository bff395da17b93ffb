//! Home-based storage locations: `~/.session-telemetry/`.
//!
//! Set `SESSION_TELEMETRY_HOME` to point the whole tree somewhere else.

use anyhow::{Context, Result};
use std::path::PathBuf;

const TELEMETRY_DIR: &str = ".session-telemetry";

/// Overrides the home directory, mainly for tests and sandboxed runs.
pub const HOME_ENV: &str = "SESSION_TELEMETRY_HOME";

/// Returns the telemetry home directory without creating it.
pub fn telemetry_home_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not determine home directory for telemetry config")?;
    Ok(home.join(TELEMETRY_DIR))
}

/// Returns the user config path: `~/.session-telemetry/config.yaml`
pub fn config_path() -> Result<PathBuf> {
    Ok(telemetry_home_dir()?.join("config.yaml"))
}

#[cfg(test)]
#[path = "tests/paths_tests.rs"]
mod tests;
