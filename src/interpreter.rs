//! Classification of the server's one-line replies.
//!
//! A reply is one of:
//! - a bare integer: an informational status code, logged and otherwise ignored
//! - `<command>[:<flag>]` where command is `run`, `pause` or `stop`
//! - anything else, which is inert
//!
//! Independently of that, the reply may ask for a screenshot upload. See
//! [`ScreenshotFlagPolicy`] for how that flag is detected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A control command sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Run,
    Pause,
    Stop,
}

impl Command {
    /// Case-sensitive match against the command vocabulary.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "run" => Some(Command::Run),
            "pause" => Some(Command::Pause),
            "stop" => Some(Command::Stop),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Command::Run => "run",
            Command::Pause => "pause",
            Command::Stop => "stop",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the screenshot request flag is read from a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenshotFlagPolicy {
    /// Any `1` in the raw line requests a screenshot. This is what existing
    /// servers expect, and it also fires on status codes such as `401`.
    #[default]
    Substring,
    /// Only a line that is exactly `1`, or whose flag segment after the first
    /// `:` is exactly `1`, requests a screenshot.
    Strict,
}

/// Result of interpreting one reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interpretation {
    pub screenshot_requested: bool,
    pub command: Option<Command>,
    pub status_code: Option<i64>,
}

impl Interpretation {
    /// The interpretation of a missing reply: nothing to do.
    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseInterpreter {
    policy: ScreenshotFlagPolicy,
}

impl ResponseInterpreter {
    pub fn new(policy: ScreenshotFlagPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ScreenshotFlagPolicy {
        self.policy
    }

    pub fn interpret(&self, raw: Option<&str>) -> Interpretation {
        let Some(line) = raw else {
            return Interpretation::none();
        };

        let screenshot_requested = self.screenshot_flag(line);

        if let Ok(code) = line.parse::<i64>() {
            return Interpretation {
                screenshot_requested,
                command: None,
                status_code: Some(code),
            };
        }

        let token = line.split(':').next().unwrap_or_default();
        Interpretation {
            screenshot_requested,
            command: Command::parse(token),
            status_code: None,
        }
    }

    fn screenshot_flag(&self, line: &str) -> bool {
        match self.policy {
            ScreenshotFlagPolicy::Substring => line.contains('1'),
            ScreenshotFlagPolicy::Strict => {
                line == "1"
                    || line
                        .split_once(':')
                        .is_some_and(|(_, flag)| flag == "1")
            }
        }
    }
}

/// Human-readable meaning of the status codes the server is known to send.
pub fn status_message(code: i64) -> Option<&'static str> {
    match code {
        200 => Some("[OK] Everything works as expected."),
        400 => Some("[Invalid format] Invalid body format."),
        401 => Some("[Unauthorized] Unauthorized access. Probably invalid token."),
        403 => Some("[Forbidden] It is forbidden for you to do that."),
        429 => Some("[Too Many Requests] You posted that too many times."),
        503 => Some(
            "[Service Unavailable] Server is currently not accepting any requests. Probably under maintenance.",
        ),
        _ => None,
    }
}

/// Logs a reply if it is a bare status code. Other replies are left alone.
pub fn log_status_code(endpoint: &str, line: &str) {
    let Ok(code) = line.parse::<i64>() else {
        return;
    };
    match status_message(code) {
        Some(message) if code == 200 => {
            tracing::debug!(endpoint, code, "Server response: {}", message)
        }
        Some(message) => tracing::info!(endpoint, code, "Server response: {}", message),
        None => tracing::debug!(endpoint, code, "Server response with unknown status code"),
    }
}

#[cfg(test)]
#[path = "tests/interpreter_tests.rs"]
mod tests;
