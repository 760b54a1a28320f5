//! Transport abstraction for history pages and answer streams

use async_trait::async_trait;
use scrollback_client::{ApiClient, ChatEventStream, Error, Page, PageParams, Result};
use tokio_util::sync::CancellationToken;

/// Transport used by the controller
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch one page of history. Implementations should stop early and
    /// return [`Error::Aborted`] once `cancel` fires.
    async fn fetch_page(&self, params: PageParams, cancel: CancellationToken) -> Result<Page>;

    /// Post a chat request and return the answer stream
    async fn open_stream(&self, url: &str, body: serde_json::Value) -> Result<ChatEventStream>;
}

/// HTTP transport backed by [`ApiClient`]
pub struct HttpTransport {
    client: ApiClient,
}

impl HttpTransport {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_page(&self, params: PageParams, cancel: CancellationToken) -> Result<Page> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Aborted),
            page = self.client.list_messages(&params) => page,
        }
    }

    async fn open_stream(&self, url: &str, body: serde_json::Value) -> Result<ChatEventStream> {
        self.client.stream_chat(url, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    /// A backend that accepts connections and never answers.
    async fn silent_backend() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{}", addr)
    }

    fn params() -> PageParams {
        PageParams {
            conversation_id: "c1".into(),
            limit: 10,
            first_id: None,
        }
    }

    #[tokio::test]
    async fn test_cancel_aborts_pending_fetch() {
        let client = ApiClient::new(silent_backend().await, "key", "user-1").unwrap();
        let transport = HttpTransport::new(client);

        let cancel = CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
            }
        });

        let result = tokio::time::timeout(Duration::from_secs(5), transport.fetch_page(params(), cancel))
            .await
            .expect("fetch should stop once cancelled");
        assert!(matches!(result, Err(Error::Aborted)));
    }

    #[tokio::test]
    async fn test_already_cancelled_fetch_never_sends() {
        // Nothing listens here; a sent request would fail with a connect error
        let client = ApiClient::new("http://127.0.0.1:9", "key", "user-1").unwrap();
        let transport = HttpTransport::new(client);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = transport.fetch_page(params(), cancel).await;
        assert!(matches!(result, Err(Error::Aborted)));
    }
}
