//! Per-conversation history and streaming controller

use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use scrollback_client::{
    ChatEventStream, ChatItem, OPENING_STATEMENT_ID, Page, PageParams, QUESTION_ID_PREFIX,
    StreamEvent,
};
use serde::Serialize;
use tokio::sync::{Notify, broadcast};

use crate::{
    anchor::{PaginationCursor, update_anchor},
    clock::{Clock, SystemClock},
    error::{Error, Result},
    events::ControllerEvent,
    lifecycle::{RequestLifecycle, RequestTicket, Settled},
    reconciler::StreamReconciler,
    store::MessageStore,
    throttle::{MAX_RETRY_COUNT, RetryDecision, RetryThrottle, SCROLL_DEBOUNCE_MS},
    transport::Transport,
};

/// Default number of exchanges requested per page
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Notice broadcast when a send is rejected because an answer is still streaming
pub const WAIT_FOR_RESPONSE_NOTICE: &str = "Please wait for the current response to finish";

/// Controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Conversation to page through; empty for a conversation not created yet
    pub conversation_id: String,
    /// Exchanges requested per page
    pub page_limit: u32,
    /// Minimum spacing between load-more fetches
    pub debounce_ms: u64,
    /// Consecutive empty merges tolerated
    pub max_retries: u32,
    /// Introduction shown ahead of the oldest history
    pub opening_statement: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            conversation_id: String::new(),
            page_limit: DEFAULT_PAGE_LIMIT,
            debounce_ms: SCROLL_DEBOUNCE_MS,
            max_retries: MAX_RETRY_COUNT,
            opening_statement: None,
        }
    }
}

impl ControllerConfig {
    pub fn for_conversation(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            ..Self::default()
        }
    }
}

/// Read-only view of the controller for the UI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChatSnapshot {
    pub items: Vec<ChatItem>,
    pub is_loading_more: bool,
    pub completion: String,
    pub is_responding: bool,
    pub message_id: Option<String>,
    pub has_more: bool,
    pub retry_count: u32,
    pub conversation_id: String,
}

/// What a page load did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The page was merged
    Applied {
        unique_count: usize,
        retry: RetryDecision,
    },
    /// Skipped: inside the debounce window
    Throttled,
    /// Skipped: a page request is already in flight
    Busy,
    /// Skipped: the backend reported no older history
    EndOfHistory,
    /// The result was superseded by a newer request and dropped
    Discarded,
}

impl LoadOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, LoadOutcome::Applied { .. })
    }
}

struct ControllerState {
    conversation_id: String,
    store: MessageStore,
    cursor: PaginationCursor,
    throttle: RetryThrottle,
    lifecycle: RequestLifecycle,
    reconciler: StreamReconciler,
    has_more: bool,
}

impl ControllerState {
    fn page_params(&self, limit: u32, first_id: Option<String>) -> PageParams {
        PageParams {
            conversation_id: self.conversation_id.clone(),
            limit,
            first_id,
        }
    }

    /// Merge, then re-anchor, then feed the retry counter.
    fn apply_page(&mut self, page: Page, opening_statement: Option<&str>) -> (usize, RetryDecision) {
        let prev_items_len = self.store.len();
        let unique_count = self.store.merge_page(page.items);
        self.has_more = page.has_more;

        if !page.has_more {
            if let Some(text) = opening_statement {
                if !self.store.contains(OPENING_STATEMENT_ID) {
                    self.store
                        .merge_page(vec![ChatItem::opening_statement(text)]);
                }
            }
        }

        self.cursor = update_anchor(self.store.items());
        let retry = self.throttle.on_merge_result(unique_count, prev_items_len);
        (unique_count, retry)
    }
}

struct Shared {
    config: ControllerConfig,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    state: Mutex<ControllerState>,
    event_tx: broadcast::Sender<ControllerEvent>,
    idle_notify: Notify,
}

/// Releases the in-flight slot if a page fetch future is dropped mid-request.
struct PendingRequest<'a> {
    shared: &'a Shared,
    epoch: u64,
    settled: bool,
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!("Page request {} dropped before settling", self.epoch);
            self.shared.state.lock().lifecycle.abandon(self.epoch);
        }
    }
}

/// History pagination and answer streaming for one conversation.
///
/// Cloning is cheap; all clones drive the same conversation. State is only
/// mutated under a short synchronous lock, never across an await point.
#[derive(Clone)]
pub struct ChatController {
    shared: Arc<Shared>,
}

impl ChatController {
    /// Create a controller using the system clock
    pub fn new(config: ControllerConfig, transport: Arc<dyn Transport>) -> Self {
        Self::with_clock(config, transport, Arc::new(SystemClock))
    }

    /// Create a controller with an explicit clock
    pub fn with_clock(
        config: ControllerConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        let state = ControllerState {
            conversation_id: config.conversation_id.clone(),
            store: MessageStore::new(),
            cursor: PaginationCursor::default(),
            throttle: RetryThrottle::new(config.debounce_ms, config.max_retries),
            lifecycle: RequestLifecycle::new(),
            reconciler: StreamReconciler::new(),
            has_more: true,
        };
        Self {
            shared: Arc::new(Shared {
                config,
                transport,
                clock,
                state: Mutex::new(state),
                event_tx,
                idle_notify: Notify::new(),
            }),
        }
    }

    /// Subscribe to controller events
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.shared.event_tx.subscribe()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.shared.config
    }

    /// Current state for rendering
    pub fn snapshot(&self) -> ChatSnapshot {
        let state = self.shared.state.lock();
        let stream = state.reconciler.state();
        ChatSnapshot {
            items: state.store.items().to_vec(),
            is_loading_more: state.lifecycle.is_in_flight(),
            completion: stream.completion.clone(),
            is_responding: stream.is_responding,
            message_id: stream.message_id.clone(),
            has_more: state.has_more,
            retry_count: state.throttle.retry_count(),
            conversation_id: state.conversation_id.clone(),
        }
    }

    pub fn items(&self) -> Vec<ChatItem> {
        self.shared.state.lock().store.items().to_vec()
    }

    pub fn cursor(&self) -> PaginationCursor {
        self.shared.state.lock().cursor.clone()
    }

    pub fn conversation_id(&self) -> String {
        self.shared.state.lock().conversation_id.clone()
    }

    pub fn is_responding(&self) -> bool {
        self.shared.state.lock().reconciler.is_responding()
    }

    pub fn retry_count(&self) -> u32 {
        self.shared.state.lock().throttle.retry_count()
    }

    /// Task id of the current or last answer, if the backend sent one
    pub fn task_id(&self) -> Option<String> {
        self.shared.state.lock().reconciler.state().task_id.clone()
    }

    /// Forget all loaded history so the next [`load_initial`] starts fresh.
    ///
    /// Any page request in flight is superseded and its result discarded. An
    /// answer still streaming is unaffected and is added once it completes.
    ///
    /// [`load_initial`]: ChatController::load_initial
    pub fn reset_history(&self) {
        let mut state = self.shared.state.lock();
        state.lifecycle.invalidate();
        state.store = MessageStore::new();
        state.cursor = PaginationCursor::default();
        state.throttle = RetryThrottle::new(
            self.shared.config.debounce_ms,
            self.shared.config.max_retries,
        );
        state.has_more = true;
        tracing::debug!("History reset");
    }

    /// Fetch the newest page of history. Supersedes any page request in flight.
    pub async fn load_initial(&self) -> Result<LoadOutcome> {
        let (ticket, params) = {
            let mut state = self.shared.state.lock();
            let params = state.page_params(self.shared.config.page_limit, None);
            (state.lifecycle.begin(), params)
        };
        tracing::debug!(
            "Loading initial page for conversation '{}' (request {})",
            params.conversation_id,
            ticket.epoch()
        );
        self.fetch_and_apply(ticket, params).await
    }

    /// Fetch the page preceding the oldest answer held.
    ///
    /// A no-op while a page request is in flight, once history is exhausted,
    /// or inside the debounce window.
    pub async fn load_more(&self) -> Result<LoadOutcome> {
        let (ticket, params) = {
            let mut state = self.shared.state.lock();
            if state.lifecycle.is_in_flight() {
                return Ok(LoadOutcome::Busy);
            }
            if !state.has_more {
                return Ok(LoadOutcome::EndOfHistory);
            }
            if state.throttle.should_throttle(self.shared.clock.now_ms()) {
                return Ok(LoadOutcome::Throttled);
            }
            let first_id = state.cursor.first_id.clone();
            let params = state.page_params(self.shared.config.page_limit, first_id);
            (state.lifecycle.begin(), params)
        };
        tracing::debug!(
            "Loading page before {:?} (request {})",
            params.first_id,
            ticket.epoch()
        );
        self.fetch_and_apply(ticket, params).await
    }

    async fn fetch_and_apply(&self, ticket: RequestTicket, params: PageParams) -> Result<LoadOutcome> {
        let mut pending = PendingRequest {
            shared: &self.shared,
            epoch: ticket.epoch(),
            settled: false,
        };
        let result = self
            .shared
            .transport
            .fetch_page(params, ticket.cancel_token())
            .await
            .map_err(Error::from);
        pending.settled = true;

        let mut state = self.shared.state.lock();
        match state.lifecycle.settle(&ticket, result) {
            Settled::Resolved(Ok(page)) => {
                let has_more = page.has_more;
                let (unique_count, retry) =
                    state.apply_page(page, self.shared.config.opening_statement.as_deref());
                drop(state);

                tracing::debug!(
                    "Applied page {}: {} new items, has_more: {}, retry: {:?}",
                    ticket.epoch(),
                    unique_count,
                    has_more,
                    retry
                );
                self.emit(ControllerEvent::PageApplied {
                    epoch: ticket.epoch(),
                    unique_count,
                    has_more,
                    retry,
                });
                Ok(LoadOutcome::Applied {
                    unique_count,
                    retry,
                })
            }
            Settled::Resolved(Err(e)) => {
                let prev_items_len = state.store.len();
                state.throttle.on_merge_result(0, prev_items_len);
                drop(state);
                tracing::warn!("Page request {} failed: {}", ticket.epoch(), e);
                Err(e)
            }
            Settled::Cancelled | Settled::Stale => {
                drop(state);
                tracing::debug!("Discarded superseded page request {}", ticket.epoch());
                self.emit(ControllerEvent::PageDiscarded {
                    epoch: ticket.epoch(),
                });
                Ok(LoadOutcome::Discarded)
            }
        }
    }

    /// Send a chat request and stream its answer.
    ///
    /// Returns `false` without issuing any request while another answer is
    /// still streaming. Otherwise the request is handed to a background task
    /// and `true` is returned; that task opens the stream, applies its events
    /// and, on completion, adds the exchange to history. Dropping the returned
    /// future cannot leave the controller stuck responding. `body.query`
    /// becomes the question item's text.
    pub async fn send_and_stream(&self, url: &str, body: serde_json::Value) -> bool {
        let began = self.shared.state.lock().reconciler.try_begin();
        if !began {
            tracing::info!("Send rejected: an answer is still streaming");
            self.emit(ControllerEvent::Notice {
                message: WAIT_FOR_RESPONSE_NOTICE.to_string(),
            });
            return false;
        }
        self.emit(ControllerEvent::StreamStarted);

        let query = body
            .get("query")
            .and_then(|q| q.as_str())
            .map(str::to_string);

        let controller = self.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            let opened = controller.shared.transport.open_stream(&url, body).await;
            match opened {
                Ok(stream) => controller.drive_stream(stream, query).await,
                Err(e) => controller.fail_stream(&e.to_string()),
            }
        });
        true
    }

    /// Wait until no answer is streaming.
    pub async fn wait_for_response(&self) {
        let notified = self.shared.idle_notify.notified();
        if !self.is_responding() {
            return;
        }
        notified.await;
    }

    async fn drive_stream(self, mut stream: ChatEventStream, query: Option<String>) {
        while let Some(event) = stream.next().await {
            match event {
                StreamEvent::Data {
                    chunk,
                    is_first,
                    meta,
                } => {
                    let update = {
                        let mut state = self.shared.state.lock();
                        state.reconciler.on_data(&chunk, is_first, &meta);
                        if state.conversation_id.is_empty() {
                            if let Some(id) = meta.conversation_id {
                                tracing::debug!("Adopted conversation '{}'", id);
                                state.conversation_id = id;
                            }
                        }
                        stream_update(&state.reconciler)
                    };
                    self.emit(update);
                }
                StreamEvent::MessageReplace { answer } => {
                    let update = {
                        let mut state = self.shared.state.lock();
                        state.reconciler.on_message_replace(&answer);
                        stream_update(&state.reconciler)
                    };
                    self.emit(update);
                }
                StreamEvent::Completed => {
                    self.complete_stream(query.as_deref());
                    return;
                }
                StreamEvent::Error { message } => {
                    self.fail_stream(&message);
                    return;
                }
            }
        }
        self.fail_stream(&Error::StreamClosed.to_string());
    }

    fn complete_stream(&self, query: Option<&str>) {
        let answer = {
            let mut state = self.shared.state.lock();
            state.reconciler.on_completed();
            let answer = state.reconciler.state().to_answer_item();
            if let Some(ref answer) = answer {
                if let Some(query) = query {
                    state.store.upsert_latest(ChatItem::question(
                        format!("{}{}", QUESTION_ID_PREFIX, answer.id),
                        query,
                    ));
                }
                state.store.upsert_latest(answer.clone());
                state.cursor = update_anchor(state.store.items());
            }
            answer
        };
        self.emit(ControllerEvent::StreamCompleted { answer });
        self.shared.idle_notify.notify_waiters();
    }

    fn fail_stream(&self, message: &str) {
        self.shared.state.lock().reconciler.on_error(message);
        self.emit(ControllerEvent::StreamFailed {
            message: message.to_string(),
        });
        self.shared.idle_notify.notify_waiters();
    }

    fn emit(&self, event: ControllerEvent) {
        let _ = self.shared.event_tx.send(event);
    }
}

fn stream_update(reconciler: &StreamReconciler) -> ControllerEvent {
    let state = reconciler.state();
    ControllerEvent::StreamUpdated {
        completion: state.completion.clone(),
        message_id: state.message_id.clone(),
    }
}
