//! Stream event envelope consumed by the chat widget
//! One message id per response; start, deltas, then exactly one end

use axum::body::Bytes;
use serde::Serialize;
use uuid::Uuid;

/// Wire events of the UI message stream protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    TextStart { id: String },
    TextDelta { id: String, delta: String },
    TextEnd { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    Open,
    Closed,
}

/// Envelope state machine. Emission is only possible through these methods,
/// and every method returns `None` once the envelope is closed, so no event
/// can follow `text-end`.
#[derive(Debug)]
pub struct EventFramer {
    id: String,
    phase: Phase,
}

impl EventFramer {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            phase: Phase::Pending,
        }
    }

    pub fn start(&mut self) -> Option<StreamEvent> {
        match self.phase {
            Phase::Pending => {
                self.phase = Phase::Open;
                Some(StreamEvent::TextStart {
                    id: self.id.clone(),
                })
            }
            _ => None,
        }
    }

    /// Deltas carry only non-empty text; empty fragments are dropped.
    pub fn delta(&mut self, text: &str) -> Option<StreamEvent> {
        match self.phase {
            Phase::Open if !text.is_empty() => Some(StreamEvent::TextDelta {
                id: self.id.clone(),
                delta: text.to_string(),
            }),
            _ => None,
        }
    }

    pub fn end(&mut self) -> Option<StreamEvent> {
        match self.phase {
            Phase::Open => {
                self.phase = Phase::Closed;
                Some(StreamEvent::TextEnd {
                    id: self.id.clone(),
                })
            }
            _ => None,
        }
    }
}

impl Default for EventFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializes one event as a `data: <json>\n\n` line.
pub fn sse_line(event: &StreamEvent) -> Bytes {
    let json = serde_json::to_string(event).unwrap();
    Bytes::from(format!("data: {json}\n\n"))
}
