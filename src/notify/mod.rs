//! Notification rendering and webhook delivery.
//!
//! [`format::render`] is a pure formatter from a timeline event to message
//! text; [`WebhookNotifier`] performs the HTTP delivery. Delivery is
//! fire-and-forget from the engine's perspective: a failed send is logged and
//! the event is still marked as reported, trading an occasional lost message
//! for never spamming duplicates on every later poll.

pub mod format;

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("webhook returned {0}")]
    Status(reqwest::StatusCode),
}

/// Where a rendered message should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// The main match-commentary webhook.
    Main,
    /// The operator/debug webhook (unmapped event codes, heartbeats).
    Debug,
}

/// A message ready for delivery, tagged with the event that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedNotification {
    pub text: String,
    pub channel: Channel,
    pub event_id: String,
    pub match_id: String,
}

/// The delivery interface the reconciliation engine consumes.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: &RenderedNotification) -> Result<(), DeliveryError>;
}

// Also implemented for Arc<N> so tests can keep a handle for assertions.
#[async_trait]
impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    async fn deliver(&self, notification: &RenderedNotification) -> Result<(), DeliveryError> {
        (**self).deliver(notification).await
    }
}

/// Posts `{"text": ...}` payloads to incoming-webhook URLs.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    debug_url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(
        url: String,
        debug_url: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            url,
            debug_url,
        })
    }

    /// Post raw text to a channel. Diagnostics without a configured debug
    /// webhook are dropped, not an error.
    pub async fn post(&self, channel: Channel, text: &str) -> Result<(), DeliveryError> {
        let url = match channel {
            Channel::Main => &self.url,
            Channel::Debug => match &self.debug_url {
                Some(url) => url,
                None => {
                    debug!("no debug webhook configured, dropping diagnostic");
                    return Ok(());
                }
            },
        };
        let resp = self
            .client
            .post(url)
            .json(&json!({ "text": text }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(DeliveryError::Status(resp.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, notification: &RenderedNotification) -> Result<(), DeliveryError> {
        self.post(notification.channel, &notification.text).await
    }
}
