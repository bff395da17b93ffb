//! Session controller: session identity, status updates and command dispatch.
//!
//! All operations here block on the network. The heartbeat runs them on the
//! blocking pool; other callers should do the same when they live on an
//! async runtime.

use crate::adapter::BotAdapter;
use crate::codec;
use crate::config::TelemetryConfig;
use crate::interpreter::{self, Command, Interpretation, ResponseInterpreter};
use crate::metrics::MetricAccumulator;
use crate::protocol::{
    ActionRequest, ClientKind, Endpoint, IdRequest, NotificationRequest, NotificationType,
    ScreenshotUpload, StatusReport,
};
use crate::screenshot::{self, Bound};
use crate::transport::{Method, Transport};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Session id of a controller that has not yet been assigned one.
pub const UNBOUND_SESSION_ID: i64 = -1;

/// Reason handed to the bot when the server orders a stop.
pub const STOP_REASON: &str = "Stopped due to WebServices request.";

/// One bot run reporting to the coordination server.
pub struct SessionController {
    transport: Arc<dyn Transport>,
    bot: Arc<dyn BotAdapter>,
    server: String,
    token: String,
    client_kind: ClientKind,
    subject_name: String,
    artifact_name: String,
    session_id: AtomicI64,
    metrics: MetricAccumulator,
    interpreter: ResponseInterpreter,
    screenshot_bound: Bound,
}

impl SessionController {
    /// Creates the controller and immediately requests a session id.
    ///
    /// A failed request leaves the controller unbound; [`update`](Self::update)
    /// retries before each status report.
    pub fn new(
        config: &TelemetryConfig,
        token: impl Into<String>,
        transport: Arc<dyn Transport>,
        bot: Arc<dyn BotAdapter>,
    ) -> Self {
        let client_kind = bot.client_kind();
        let controller = Self {
            server: config.server.clone(),
            token: token.into(),
            client_kind,
            subject_name: bot.operator_name(),
            artifact_name: bot.artifact_name(),
            session_id: AtomicI64::new(UNBOUND_SESSION_ID),
            metrics: MetricAccumulator::new(),
            interpreter: ResponseInterpreter::new(config.screenshot_flag),
            screenshot_bound: config.screenshot_bound(client_kind),
            transport,
            bot,
        };
        controller.acquire_session();
        controller
    }

    pub fn session_id(&self) -> i64 {
        self.session_id.load(Ordering::SeqCst)
    }

    pub fn is_bound(&self) -> bool {
        self.session_id() >= 0
    }

    pub fn client_kind(&self) -> ClientKind {
        self.client_kind
    }

    /// Requests a session id from `/id`. Returns the id on success.
    pub fn acquire_session(&self) -> Option<i64> {
        let request = IdRequest {
            token: self.token.clone(),
            client: self.client_kind.wire_tag().to_string(),
            script: self
                .client_kind
                .id_carries_artifact()
                .then(|| self.artifact_name.clone()),
        };

        let response = self.post(Endpoint::Id, &request)?;
        match response.parse::<i64>() {
            Ok(id) => {
                self.session_id.store(id, Ordering::SeqCst);
                tracing::info!(session_id = id, client = %self.client_kind, "Session acquired");
                Some(id)
            }
            Err(_) => {
                tracing::warn!(response = %response, "Session id response is not a number");
                None
            }
        }
    }

    /// Records a custom metric for the next status report.
    pub fn add_custom_metric(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.metrics.record(name, value);
    }

    /// Number of custom metrics waiting for the next status report.
    pub fn pending_metrics(&self) -> usize {
        self.metrics.len()
    }

    /// Reports the bot status and acts on the server's reply.
    ///
    /// Pending custom metrics are drained into this report whether or not the
    /// send succeeds. A screenshot request is served before any command is
    /// dispatched.
    pub fn update(
        &self,
        status: &str,
        experience: i64,
        runtime: u64,
        login: Option<&str>,
    ) -> Interpretation {
        if !self.is_bound() {
            self.acquire_session();
        }

        let report = StatusReport {
            token: self.token.clone(),
            sid: self.session_id(),
            user: self.subject_name.clone(),
            status: status.to_string(),
            artifact: self.client_kind.artifact(&self.artifact_name),
            client: self.client_kind.wire_tag().to_string(),
            experience,
            runtime,
            login: login.unwrap_or_default().to_string(),
            custom: self.metrics.drain(),
        };

        let response = self.post(Endpoint::Session, &report);
        let interpretation = self.interpreter.interpret(response.as_deref());

        if interpretation.screenshot_requested {
            self.send_screenshot();
        }
        if let Some(command) = interpretation.command {
            self.dispatch(command);
        }
        interpretation
    }

    /// Applies a server command to the bot.
    ///
    /// Repeating a command that is already satisfied does nothing, so the same
    /// reply on consecutive ticks never toggles the bot.
    pub fn dispatch(&self, command: Command) {
        match command {
            Command::Run => {
                if !self.bot.is_running() && !self.bot.is_stopped() {
                    tracing::info!("Server requested run, resuming bot");
                    self.bot.resume();
                }
            }
            Command::Pause => {
                if !self.bot.is_paused() {
                    tracing::info!("Server requested pause, pausing bot");
                    self.bot.pause();
                }
            }
            Command::Stop => {
                tracing::info!("Server requested stop");
                self.bot.stop(STOP_REASON);
            }
        }
    }

    /// Captures, scales and uploads a screenshot. Returns true once the upload
    /// got a reply.
    pub fn send_screenshot(&self) -> bool {
        let Some(frame) = self.bot.capture_screen() else {
            tracing::debug!("Bot has no frame to capture, skipping screenshot");
            return false;
        };

        let image = match screenshot::prepare_upload(&frame, self.screenshot_bound) {
            Ok(image) => image,
            Err(e) => {
                tracing::error!("Screenshot upload aborted: {:#}", e);
                return false;
            }
        };

        let upload = ScreenshotUpload {
            sid: self.session_id(),
            token: self.token.clone(),
            username: self.subject_name.clone(),
            client: self.client_kind.wire_tag().to_string(),
            image,
        };
        self.post(Endpoint::Screenshot, &upload).is_some()
    }

    /// Sends a one-shot notification and returns the server's reply, if any.
    pub fn send_notification(
        &self,
        title: &str,
        message: &str,
        kind: NotificationType,
    ) -> Option<String> {
        let notification = NotificationRequest {
            sid: self.session_id(),
            token: self.token.clone(),
            title: title.to_string(),
            message: message.to_string(),
            username: self.subject_name.clone(),
            artifact: self.client_kind.artifact(&self.artifact_name),
            client: self.client_kind.wire_tag().to_string(),
            kind,
        };
        self.post(Endpoint::Notification, &notification)
    }

    /// Tells the server the bot was paused locally.
    pub fn on_pause(&self) -> Option<String> {
        self.send_action(Endpoint::Pause)
    }

    /// Tells the server the bot was resumed locally.
    pub fn on_resume(&self) -> Option<String> {
        self.send_action(Endpoint::Resume)
    }

    fn send_action(&self, endpoint: Endpoint) -> Option<String> {
        let request = ActionRequest {
            token: self.token.clone(),
            client: self.client_kind.action_tag().to_string(),
            sid: self.session_id(),
        };
        self.post(endpoint, &request)
    }

    /// Encodes and sends a payload. Failures are logged and yield `None`.
    fn post<P: Serialize>(&self, endpoint: Endpoint, payload: &P) -> Option<String> {
        let body = match codec::encode(payload) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(endpoint = endpoint.path(), "Failed to encode payload: {}", e);
                return None;
            }
        };

        let url = endpoint.url(&self.server);
        tracing::debug!(endpoint = endpoint.path(), bytes = body.len(), "Sending request");

        match self.transport.send(&url, Method::Post, &body) {
            Ok(line) => {
                tracing::debug!(endpoint = endpoint.path(), response = %line, "Received response");
                interpreter::log_status_code(endpoint.path(), &line);
                Some(line)
            }
            Err(e) => {
                tracing::warn!(endpoint = endpoint.path(), "Request failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
