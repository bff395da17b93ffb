//! The control surface of the driven bot.
//!
//! Each bot framework gets one binding implementing [`BotAdapter`]; the session
//! controller only ever talks to the trait.

use crate::protocol::ClientKind;
use image::{Rgba, RgbaImage};
use std::sync::{Mutex, MutexGuard};

pub trait BotAdapter: Send + Sync {
    /// Framework family, which selects the wire dialect.
    fn client_kind(&self) -> ClientKind;

    /// Identity of the operator the framework is authenticated as.
    fn operator_name(&self) -> String;

    /// Name of the running script or bot.
    fn artifact_name(&self) -> String;

    fn is_running(&self) -> bool;
    fn is_paused(&self) -> bool;
    fn is_stopped(&self) -> bool;

    fn pause(&self);
    fn resume(&self);
    fn stop(&self, reason: &str);

    /// Captures the bot's visible surface. Frameworks without a capture
    /// facility return `None`, which skips screenshot uploads.
    fn capture_screen(&self) -> Option<RgbaImage> {
        None
    }
}

/// Run state of a [`SimulatedBot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    Running,
    Paused,
    Stopped,
}

/// In-process bot used by the `telemetry` binary to exercise a full session
/// without a real automation framework.
///
/// Captures render a synthetic frame of the configured canvas size.
pub struct SimulatedBot {
    kind: ClientKind,
    operator: String,
    name: String,
    canvas: (u32, u32),
    state: Mutex<SimulatedState>,
}

struct SimulatedState {
    run_state: BotState,
    stop_reason: Option<String>,
}

/// Canvas size of the classic fixed-mode game client.
pub const DEFAULT_CANVAS: (u32, u32) = (765, 503);

impl SimulatedBot {
    pub fn new(kind: ClientKind, operator: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            operator: operator.into(),
            name: name.into(),
            canvas: DEFAULT_CANVAS,
            state: Mutex::new(SimulatedState {
                run_state: BotState::Running,
                stop_reason: None,
            }),
        }
    }

    pub fn with_canvas(mut self, width: u32, height: u32) -> Self {
        self.canvas = (width, height);
        self
    }

    pub fn state(&self) -> BotState {
        self.lock().run_state
    }

    pub fn stop_reason(&self) -> Option<String> {
        self.lock().stop_reason.clone()
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn render_frame(&self) -> RgbaImage {
        let (width, height) = self.canvas;
        let tint = match self.state() {
            BotState::Running => 160,
            BotState::Paused => 96,
            BotState::Stopped => 32,
        };
        RgbaImage::from_fn(width, height, |x, y| {
            let r = u8::try_from(x * 255 / width.max(1)).unwrap_or(u8::MAX);
            let g = u8::try_from(y * 255 / height.max(1)).unwrap_or(u8::MAX);
            Rgba([r, g, tint, 255])
        })
    }
}

impl BotAdapter for SimulatedBot {
    fn client_kind(&self) -> ClientKind {
        self.kind
    }

    fn operator_name(&self) -> String {
        self.operator.clone()
    }

    fn artifact_name(&self) -> String {
        self.name.clone()
    }

    fn is_running(&self) -> bool {
        self.state() == BotState::Running
    }

    fn is_paused(&self) -> bool {
        self.state() == BotState::Paused
    }

    fn is_stopped(&self) -> bool {
        self.state() == BotState::Stopped
    }

    fn pause(&self) {
        let mut state = self.lock();
        if state.run_state == BotState::Running {
            state.run_state = BotState::Paused;
            tracing::info!(bot = %self.name, "Bot paused");
        }
    }

    fn resume(&self) {
        let mut state = self.lock();
        if state.run_state == BotState::Paused {
            state.run_state = BotState::Running;
            tracing::info!(bot = %self.name, "Bot resumed");
        }
    }

    fn stop(&self, reason: &str) {
        let mut state = self.lock();
        if state.run_state != BotState::Stopped {
            state.run_state = BotState::Stopped;
            state.stop_reason = Some(reason.to_string());
            tracing::info!(bot = %self.name, reason, "Bot stopped");
        }
    }

    fn capture_screen(&self) -> Option<RgbaImage> {
        let (width, height) = self.canvas;
        if width == 0 || height == 0 {
            return None;
        }
        Some(self.render_frame())
    }
}

#[cfg(test)]
#[path = "tests/adapter_tests.rs"]
mod tests;
