//! scrollback-client: wire types and HTTP/SSE client
//!
//! This crate provides the chat item model shared with the controller, the
//! streaming event types, and a client for the message-list and streaming
//! chat endpoints.

pub mod api;
pub mod error;
pub mod stream;
pub mod types;

pub use api::ApiClient;
pub use error::{Error, Result};
pub use stream::{ChatEventStream, StreamEvent, StreamMeta};
pub use types::*;
