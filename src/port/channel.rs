//! Notification channel port.
//!
//! One implementation per delivery medium (email, chat webhook, SMS,
//! social post, ...). The fan-out logic in
//! [`app::notify`](crate::app::notify) is channel-agnostic: it iterates a
//! list of implementations and never branches on channel kind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ConfirmedGlitch, Subscriber};
use crate::error::Result;

/// Outcome of one channel send attempt for one recipient.
#[derive(Debug, Clone)]
pub struct ChannelSendResult {
    pub channel: &'static str,
    pub subscriber_id: String,
    pub success: bool,
    /// Provider-assigned message id on success.
    pub message_id: Option<String>,
    pub error: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// A single notification delivery medium.
///
/// Implementations must be thread-safe (`Send + Sync`); fan-out issues
/// sends concurrently. Every send must resolve within a bounded time.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Channel name for logging and result records.
    fn kind(&self) -> &'static str;

    /// The subscriber's delivery target for this channel, if configured.
    /// `None` skips the channel for that recipient.
    fn target_for(&self, subscriber: &Subscriber) -> Option<String>;

    /// Deliver the glitch to `target`, returning the provider message id.
    async fn send(&self, glitch: &ConfirmedGlitch, target: &str) -> Result<String>;
}
