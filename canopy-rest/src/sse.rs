//! Server-Sent Events framing and the database's streaming event kinds.

use canopy_store::{StoreError, StoreResult};
use serde::Deserialize;
use serde_json::Value;

/// One dispatched SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental SSE parser. Feed it raw chunks as they arrive.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes `chunk` and returns every event it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw);
            if let Some(event) = self.line(line.trim_end_matches(['\n', '\r'])) {
                events.push(event);
            }
        }
        events
    }

    fn line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if event.is_none() && self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event: event.unwrap_or_else(|| "message".to_string()),
            data,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Payload {
    path: String,
    data: Value,
}

/// An event of a database listener stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Replace the node at `path` (relative to the listened node).
    Put { path: String, data: Value },
    /// Merge the children of `data` into the node at `path`.
    Patch { path: String, data: Value },
    KeepAlive,
    /// The server closed the stream, e.g. after a rules change.
    Cancel(String),
    AuthRevoked,
    Unknown(String),
}

impl StreamEvent {
    pub fn from_sse(event: &SseEvent) -> StoreResult<Self> {
        match event.event.as_str() {
            "put" | "patch" => {
                let payload: Payload = serde_json::from_str(&event.data)?;
                Ok(if event.event == "put" {
                    Self::Put {
                        path: payload.path,
                        data: payload.data,
                    }
                } else {
                    Self::Patch {
                        path: payload.path,
                        data: payload.data,
                    }
                })
            }
            "keep-alive" => Ok(Self::KeepAlive),
            "cancel" => Ok(Self::Cancel(event.data.clone())),
            "auth_revoked" => Ok(Self::AuthRevoked),
            other => Ok(Self::Unknown(other.to_string())),
        }
    }

    /// The error that ends the stream, for events that end it.
    pub fn closing_error(&self) -> Option<StoreError> {
        match self {
            Self::Cancel(reason) => Some(StoreError::ListenerClosed(format!(
                "cancelled by server: {reason}"
            ))),
            Self::AuthRevoked => Some(StoreError::ListenerClosed(
                "credential revoked".to_string(),
            )),
            _ => None,
        }
    }
}
