//! HTTP client for the chat backend

use async_stream::stream;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};

use crate::{
    error::{Error, Result},
    stream::{ChatEventStream, FrameDecoder, StreamEvent},
    types::{MessageListResponse, Page, PageParams},
};

/// Chat backend API client
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    user: String,
}

impl ApiClient {
    /// Create a new client for `base_url` (e.g. `https://api.example.com/v1`)
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::InvalidConfig("base URL is empty".to_string()));
        }
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::InvalidApiKey);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            user: user.into(),
        })
    }

    /// Resolve a path against the base URL; absolute URLs pass through.
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }

    /// Fetch one page of conversation history
    pub async fn list_messages(&self, params: &PageParams) -> Result<Page> {
        let url = self.resolve("messages");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(params)
            .query(&[("user", self.user.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), text));
        }

        let list: MessageListResponse = response.json().await?;
        let limit = list.limit.unwrap_or(params.limit);
        tracing::debug!(
            "Fetched {} records (has_more: {:?}, first_id: {:?})",
            list.data.len(),
            list.has_more,
            params.first_id
        );
        Ok(Page::from_records(list.data, list.has_more, limit))
    }

    /// Post a chat request and stream the answer
    pub fn stream_chat(&self, url: &str, body: &serde_json::Value) -> Result<ChatEventStream> {
        let url = self.resolve(url);
        let request_builder = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body);

        let event_source = EventSource::new(request_builder)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

        Ok(Box::pin(create_stream(event_source)))
    }
}

fn create_stream(mut event_source: EventSource) -> impl futures::Stream<Item = StreamEvent> {
    stream! {
        let mut decoder = FrameDecoder::new();

        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    let Some(event) = decoder.decode(&msg.data) else {
                        continue;
                    };
                    let terminal = event.is_terminal();
                    yield event;
                    if terminal {
                        event_source.close();
                        return;
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    // Closed before message_end; the consumer sees an unterminated stream.
                    tracing::debug!("Answer stream ended without a terminal event");
                    event_source.close();
                    return;
                }
                Err(e) => {
                    event_source.close();
                    yield StreamEvent::Error { message: format!("Stream error: {}", e) };
                    return;
                }
            }
        }
    }
}
