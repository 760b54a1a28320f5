//! Controller event types

use scrollback_client::ChatItem;
use serde::{Deserialize, Serialize};

use crate::throttle::RetryDecision;

/// Events broadcast to UI observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerEvent {
    /// A message meant for the user (e.g. a rejected send)
    Notice { message: String },

    /// A page was merged into history
    PageApplied {
        epoch: u64,
        unique_count: usize,
        has_more: bool,
        retry: RetryDecision,
    },

    /// A superseded page result was dropped
    PageDiscarded { epoch: u64 },

    /// An answer started streaming
    StreamStarted,

    /// Answer text changed
    StreamUpdated {
        completion: String,
        message_id: Option<String>,
    },

    /// Answer finished and was added to history
    StreamCompleted { answer: Option<ChatItem> },

    /// Answer failed
    StreamFailed { message: String },
}

impl ControllerEvent {
    /// Check if this event ends a streamed exchange
    pub fn is_stream_terminal(&self) -> bool {
        matches!(
            self,
            ControllerEvent::StreamCompleted { .. } | ControllerEvent::StreamFailed { .. }
        )
    }
}
