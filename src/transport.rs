//! Single-shot HTTP transport returning the first line of the reply.

use std::io::{BufRead, BufReader};
use std::time::Duration;
use thiserror::Error;

/// Default per-request timeout for [`HttpTransport`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: ureq::Error,
    },
    #[error("failed to read response from {url}: {source}")]
    Read {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("empty response from {url}")]
    EmptyResponse { url: String },
}

/// Sends one request and returns the first line of the response body.
///
/// Implementations block the calling thread until the reply arrives or the
/// request fails.
pub trait Transport: Send + Sync {
    fn send(&self, url: &str, method: Method, body: &str) -> Result<String, TransportError>;
}

/// [`Transport`] over plain HTTP(S).
///
/// The body is written followed by `\r\n`. Non-2xx statuses are not errors:
/// the server reports failures as status codes in the body text.
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(timeout)
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(Some(DEFAULT_REQUEST_TIMEOUT))
    }
}

impl Transport for HttpTransport {
    fn send(&self, url: &str, method: Method, body: &str) -> Result<String, TransportError> {
        let payload = format!("{}\r\n", body);
        let request = match method {
            Method::Post => self.agent.post(url),
        };

        let mut response = request
            .header("Content-Type", "application/json")
            .send(payload)
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;

        // Stop at the first newline; the rest of the body is never read.
        let mut raw = Vec::new();
        BufReader::new(response.body_mut().as_reader())
            .read_until(b'\n', &mut raw)
            .map_err(|source| TransportError::Read {
                url: url.to_string(),
                source,
            })?;

        decode_line(&raw).ok_or_else(|| TransportError::EmptyResponse {
            url: url.to_string(),
        })
    }
}

/// Decodes one raw line without its terminator, or `None` when nothing arrived.
/// Invalid UTF-8 is replaced rather than rejected.
fn decode_line(raw: &[u8]) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(raw);
    Some(text.trim_end_matches(&['\r', '\n'][..]).to_string())
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
