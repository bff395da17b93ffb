//! Test doubles for the transport and the bot adapter.

use crate::adapter::BotAdapter;
use crate::protocol::ClientKind;
use crate::transport::{Method, Transport, TransportError};
use image::{Rgba, RgbaImage};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// One request seen by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub method: Method,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is valid JSON")
    }
}

/// Transport answering from per-endpoint queues of canned replies.
///
/// An endpoint with an empty queue answers with an empty-response error,
/// which callers treat the same as a network failure.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Option<String>>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply line for requests to `path`.
    pub fn reply(&self, path: &str, line: &str) -> &Self {
        self.queue(path, Some(line.to_string()));
        self
    }

    /// Queues a transport failure for requests to `path`.
    pub fn fail(&self, path: &str) -> &Self {
        self.queue(path, None);
        self
    }

    fn queue(&self, path: &str, reply: Option<String>) {
        self.replies
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.ends_with(path))
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, url: &str, method: Method, body: &str) -> Result<String, TransportError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            method,
            body: body.to_string(),
        });

        let path = url
            .rfind('/')
            .map(|idx| url.split_at(idx).1)
            .unwrap_or(url)
            .to_string();
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&path)
            .and_then(|queue| queue.pop_front())
            .flatten();

        reply.ok_or(TransportError::EmptyResponse {
            url: url.to_string(),
        })
    }
}

/// Bot double that records every control call.
pub struct RecordingBot {
    kind: ClientKind,
    running: AtomicBool,
    paused: AtomicBool,
    stopped: AtomicBool,
    pub pause_calls: AtomicUsize,
    pub resume_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    pub stop_reasons: Mutex<Vec<String>>,
    frame: Option<RgbaImage>,
}

impl RecordingBot {
    pub fn running(kind: ClientKind) -> Self {
        Self {
            kind,
            running: AtomicBool::new(true),
            paused: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            pause_calls: AtomicUsize::new(0),
            resume_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            stop_reasons: Mutex::new(Vec::new()),
            frame: None,
        }
    }

    pub fn paused(kind: ClientKind) -> Self {
        let bot = Self::running(kind);
        bot.running.store(false, Ordering::SeqCst);
        bot.paused.store(true, Ordering::SeqCst);
        bot
    }

    pub fn with_frame(mut self, width: u32, height: u32) -> Self {
        self.frame = Some(RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255])));
        self
    }

    pub fn pauses(&self) -> usize {
        self.pause_calls.load(Ordering::SeqCst)
    }

    pub fn resumes(&self) -> usize {
        self.resume_calls.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

impl BotAdapter for RecordingBot {
    fn client_kind(&self) -> ClientKind {
        self.kind
    }

    fn operator_name(&self) -> String {
        "alice".to_string()
    }

    fn artifact_name(&self) -> String {
        "Fisher".to_string()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn pause(&self) {
        self.pause_calls.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.resume_calls.fetch_add(1, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
    }

    fn stop(&self, reason: &str) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.stop_reasons.lock().unwrap().push(reason.to_string());
        self.running.store(false, Ordering::SeqCst);
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn capture_screen(&self) -> Option<RgbaImage> {
        self.frame.clone()
    }
}
