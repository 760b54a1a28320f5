//! Streaming event types and SSE frame decoding

use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Identifiers attached to each streamed chunk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMeta {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
}

/// Events emitted while an answer streams in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental answer text
    Data {
        chunk: String,
        is_first: bool,
        meta: StreamMeta,
    },
    /// Full corrective replacement of the answer so far
    MessageReplace { answer: String },
    /// Answer finished
    Completed,
    /// Exchange failed
    Error { message: String },
}

impl StreamEvent {
    /// Check if this is a terminal event (Completed or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Completed | StreamEvent::Error { .. })
    }
}

/// A lazy, finite stream of answer events
pub type ChatEventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// JSON payload of one SSE `data:` frame
#[derive(Debug, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    meta: StreamMeta,
}

/// Decodes SSE frames into stream events, tracking which chunk is first.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    seen_data: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one frame. Returns `None` for frames that carry nothing for the
    /// reconciler (keep-alives, workflow bookkeeping).
    pub fn decode(&mut self, data: &str) -> Option<StreamEvent> {
        let frame: Frame = match serde_json::from_str(data) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!("Skipping undecodable SSE frame: {}", e);
                return None;
            }
        };

        match frame.event.as_str() {
            "message" | "agent_message" => {
                let is_first = !self.seen_data;
                self.seen_data = true;
                Some(StreamEvent::Data {
                    chunk: frame.answer.unwrap_or_default(),
                    is_first,
                    meta: frame.meta,
                })
            }
            "message_replace" => Some(StreamEvent::MessageReplace {
                answer: frame.answer.unwrap_or_default(),
            }),
            "message_end" => Some(StreamEvent::Completed),
            "error" => Some(StreamEvent::Error {
                message: frame
                    .message
                    .unwrap_or_else(|| "Unknown stream error".to_string()),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_message_chunks_mark_first() {
        let mut decoder = FrameDecoder::new();
        let first = decoder.decode(
            r#"{"event": "message", "answer": "Hello", "message_id": "m1", "conversation_id": "c1", "task_id": "t1"}"#,
        );
        let second = decoder.decode(r#"{"event": "message", "answer": " world", "message_id": "m1"}"#);

        assert_eq!(
            first,
            Some(StreamEvent::Data {
                chunk: "Hello".into(),
                is_first: true,
                meta: StreamMeta {
                    message_id: Some("m1".into()),
                    conversation_id: Some("c1".into()),
                    task_id: Some("t1".into()),
                },
            })
        );
        match second {
            Some(StreamEvent::Data { chunk, is_first, .. }) => {
                assert_eq!(chunk, " world");
                assert!(!is_first);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_agent_message_is_data() {
        let mut decoder = FrameDecoder::new();
        let event = decoder.decode(r#"{"event": "agent_message", "answer": "thinking"}"#);
        assert!(matches!(event, Some(StreamEvent::Data { .. })));
    }

    #[test]
    fn test_decode_replace_end_and_error() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(
            decoder.decode(r#"{"event": "message_replace", "answer": "New content"}"#),
            Some(StreamEvent::MessageReplace {
                answer: "New content".into()
            })
        );
        assert_eq!(
            decoder.decode(r#"{"event": "message_end", "message_id": "m1"}"#),
            Some(StreamEvent::Completed)
        );
        assert_eq!(
            decoder.decode(r#"{"event": "error", "message": "quota exceeded", "status": 400}"#),
            Some(StreamEvent::Error {
                message: "quota exceeded".into()
            })
        );
    }

    #[test]
    fn test_decode_ignores_ping_unknown_and_garbage() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.decode(r#"{"event": "ping"}"#), None);
        assert_eq!(decoder.decode(r#"{"event": "node_started", "data": {}}"#), None);
        assert_eq!(decoder.decode("not json"), None);
    }

    #[test]
    fn test_terminal_events() {
        assert!(StreamEvent::Completed.is_terminal());
        assert!(StreamEvent::Error { message: "x".into() }.is_terminal());
        assert!(!StreamEvent::MessageReplace { answer: "x".into() }.is_terminal());
    }
}
