//! Remote-control telemetry client for automation bots.
//!
//! A [`SessionController`] reports the status of a driven bot to a
//! coordination server on every heartbeat and applies the `run`/`pause`/`stop`
//! commands the server answers with. When asked, it also uploads a downscaled
//! screenshot of the bot's surface.
//!
//! ## Layout
//!
//! - **Transport (`transport.rs`)**: blocking single-line HTTP exchange.
//! - **Codec and protocol (`codec.rs`, `protocol.rs`)**: typed payloads per endpoint.
//! - **Interpreter (`interpreter.rs`)**: reply classification.
//! - **Screenshot (`screenshot.rs`)**: bounding, PNG and base64 encoding.
//! - **Controller (`controller.rs`)**: session identity, updates and dispatch.
//! - **Heartbeat (`heartbeat.rs`)**: the periodic task.

pub mod adapter;
pub mod codec;
pub mod config;
pub mod controller;
pub mod heartbeat;
pub mod interpreter;
pub mod metrics;
pub mod paths;
pub mod protocol;
pub mod screenshot;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{BotAdapter, SimulatedBot};
pub use config::TelemetryConfig;
pub use controller::SessionController;
pub use interpreter::{Command, Interpretation};
pub use protocol::{ClientKind, NotificationType};
pub use transport::{HttpTransport, Transport, TransportError};
