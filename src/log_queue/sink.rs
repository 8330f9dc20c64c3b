//! Log sink destinations

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Sink rejected message with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for batched log text
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Deliver one message. `content` never exceeds the queue's chunk limit.
    async fn send(&self, content: &str) -> Result<(), SinkError>;
}

#[async_trait]
impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    async fn send(&self, content: &str) -> Result<(), SinkError> {
        (**self).send(content).await
    }
}

/// Posts each message as `{"content": ...}` to a chat webhook
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Result<Self, SinkError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl LogSink for WebhookSink {
    async fn send(&self, content: &str) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "content": content }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
