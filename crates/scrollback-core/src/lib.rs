//! scrollback-core: history pagination and streaming reconciliation
//!
//! This crate provides the controller that pages backwards through a chat
//! conversation's history while a new answer streams in, keeping one
//! deduplicated, ordered list of chat items.

pub mod anchor;
pub mod clock;
pub mod controller;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod reconciler;
pub mod store;
pub mod throttle;
pub mod transport;

pub use anchor::{PaginationCursor, update_anchor};
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{ChatController, ChatSnapshot, ControllerConfig, LoadOutcome};
pub use error::{Error, Result};
pub use events::ControllerEvent;
pub use lifecycle::{RequestLifecycle, RequestTicket, Settled};
pub use reconciler::{StreamReconciler, StreamState};
pub use store::{MergeOutcome, MessageStore, merge};
pub use throttle::{MAX_RETRY_COUNT, RetryDecision, RetryThrottle, SCROLL_DEBOUNCE_MS};
pub use transport::{HttpTransport, Transport};
