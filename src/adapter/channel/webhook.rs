//! Chat-webhook notification channel.
//!
//! Posts a JSON document to the subscriber's stored webhook URL
//! (Discord/Slack-style incoming webhooks). One client instance serves
//! every recipient; the target URL travels per send.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

use super::format::format_glitch_message;
use crate::config::WebhookChannelConfig;
use crate::domain::{ConfirmedGlitch, Subscriber};
use crate::error::{Error, Result};
use crate::port::channel::NotificationChannel;

#[derive(Serialize)]
struct WebhookBody<'a> {
    content: &'a str,
    username: &'static str,
}

/// Webhook channel backed by a shared HTTP client.
#[derive(Debug)]
pub struct WebhookChannel {
    client: Client,
}

impl WebhookChannel {
    /// Build the channel with the configured send timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &WebhookChannelConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(Error::Http)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn kind(&self) -> &'static str {
        "webhook"
    }

    fn target_for(&self, subscriber: &Subscriber) -> Option<String> {
        subscriber.targets.webhook_url.clone()
    }

    async fn send(&self, glitch: &ConfirmedGlitch, target: &str) -> Result<String> {
        let message = format_glitch_message(glitch);
        let body = WebhookBody {
            content: &message,
            username: "glitchwatch",
        };

        self.client
            .post(target)
            .json(&body)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::ChannelSend(e.to_string()))?;

        // Incoming webhooks return no message id; mint a local one so the
        // send result is still correlatable in logs.
        Ok(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NotificationTargets;
    use crate::testkit::subscriber;

    #[test]
    fn body_serializes_content() {
        let body = WebhookBody {
            content: "hello",
            username: "glitchwatch",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["content"], "hello");
        assert_eq!(json["username"], "glitchwatch");
    }

    #[test]
    fn target_comes_from_subscriber_webhook_url() {
        let channel = WebhookChannel::new(&WebhookChannelConfig { timeout_ms: 1000 }).unwrap();

        let mut sub = subscriber("sub-1");
        sub.targets = NotificationTargets {
            webhook_url: Some("https://hooks.example.com/T1".into()),
            ..Default::default()
        };
        assert_eq!(
            channel.target_for(&sub).as_deref(),
            Some("https://hooks.example.com/T1")
        );

        sub.targets.webhook_url = None;
        assert!(channel.target_for(&sub).is_none());
    }
}
