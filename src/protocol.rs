//! Wire records for the coordination server.
//!
//! Every endpoint gets its own immutable payload type, built fresh per call and
//! serialized by [`crate::codec::encode`]. Field declaration order is the JSON
//! key order on the wire.

use crate::codec::CustomMetrics;
use crate::screenshot::Bound;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Server endpoints, relative to the configured base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Id,
    Session,
    Screenshot,
    Notification,
    Pause,
    Resume,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Id => "/id",
            Endpoint::Session => "/session",
            Endpoint::Screenshot => "/screenshot",
            Endpoint::Notification => "/notification",
            Endpoint::Pause => "/pause",
            Endpoint::Resume => "/resume",
        }
    }

    /// Joins the endpoint path onto a base URL, tolerating a trailing slash.
    pub fn url(self, server: &str) -> String {
        format!("{}{}", server.trim_end_matches('/'), self.path())
    }
}

/// The bot framework family a session reports as.
///
/// The two families speak slightly different dialects of the same protocol:
/// the artifact name travels under a different key and the screenshot canvas
/// differs in size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
    #[default]
    RuneMate,
    RsPeer,
}

impl ClientKind {
    /// Tag sent in the `client` field of session, screenshot and notification payloads.
    pub fn wire_tag(self) -> &'static str {
        match self {
            ClientKind::RuneMate => "RUNEMATE",
            ClientKind::RsPeer => "RSPEER",
        }
    }

    /// Tag sent in the `client` field of `/pause` and `/resume`.
    pub fn action_tag(self) -> &'static str {
        match self {
            ClientKind::RuneMate => "runemate",
            ClientKind::RsPeer => "rspeer",
        }
    }

    /// Wraps the artifact name under the key this family uses.
    pub fn artifact(self, name: &str) -> Artifact {
        match self {
            ClientKind::RuneMate => Artifact::Bot(name.to_string()),
            ClientKind::RsPeer => Artifact::Script(name.to_string()),
        }
    }

    /// RuneMate sessions also announce the script name when requesting an id.
    pub fn id_carries_artifact(self) -> bool {
        matches!(self, ClientKind::RuneMate)
    }

    pub fn default_screenshot_bound(self) -> Bound {
        match self {
            ClientKind::RuneMate => Bound::new(600, 400),
            ClientKind::RsPeer => Bound::new(800, 600),
        }
    }
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_tag())
    }
}

/// Name of the driven script or bot, keyed per client family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Artifact {
    Script(String),
    Bot(String),
}

/// `POST /id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdRequest {
    pub token: String,
    pub client: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

/// `POST /session`, sent once per heartbeat update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub token: String,
    pub sid: i64,
    pub user: String,
    pub status: String,
    #[serde(flatten)]
    pub artifact: Artifact,
    pub client: String,
    pub experience: i64,
    pub runtime: u64,
    pub login: String,
    pub custom: CustomMetrics,
}

/// `POST /screenshot`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotUpload {
    pub sid: i64,
    pub token: String,
    pub username: String,
    pub client: String,
    /// Base64 (standard alphabet, padded) PNG bytes.
    pub image: String,
}

/// `POST /notification`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationRequest {
    pub sid: i64,
    pub token: String,
    pub title: String,
    pub message: String,
    pub username: String,
    #[serde(flatten)]
    pub artifact: Artifact,
    pub client: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
}

/// `POST /pause` and `POST /resume`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub token: String,
    pub client: String,
    pub sid: i64,
}

/// Severity of an out-of-band notification. Sent as its numeric op code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationType {
    #[default]
    General,
    Error,
    Warning,
    Information,
    Success,
}

impl NotificationType {
    pub fn op(self) -> u8 {
        match self {
            NotificationType::General => 0,
            NotificationType::Error => 1,
            NotificationType::Warning => 2,
            NotificationType::Information => 3,
            NotificationType::Success => 4,
        }
    }
}

impl Serialize for NotificationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.op())
    }
}

impl FromStr for NotificationType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "general" => Ok(NotificationType::General),
            "error" => Ok(NotificationType::Error),
            "warning" => Ok(NotificationType::Warning),
            "information" | "info" => Ok(NotificationType::Information),
            "success" => Ok(NotificationType::Success),
            other => anyhow::bail!(
                "Unknown notification type '{}' (expected general, error, warning, information or success)",
                other
            ),
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
