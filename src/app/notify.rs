//! Confirmation-notification stage: dedup gate and channel fan-out.
//!
//! A glitch id is notified at most once per dedup window. Sends fan out
//! concurrently across every (eligible recipient, configured channel)
//! pair with settle-all semantics: one channel's failure never blocks
//! another's attempt. The dedup marker is written after all attempts
//! resolve, success or not, so a retried entry cannot spam subscribers;
//! aggregate success still requires at least one real delivery.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::app::consumer::EntryHandler;
use crate::domain::{ConfirmedGlitch, Subscriber};
use crate::error::{HandlerError, Result};
use crate::port::broker::{Broker, StreamEntry};
use crate::port::channel::{ChannelSendResult, NotificationChannel};
use crate::port::directory::SubscriberDirectory;

/// Dedup marker key for a glitch.
#[must_use]
pub fn dedup_key(glitch_id: &uuid::Uuid) -> String {
    format!("notified:{glitch_id}")
}

/// Outcome of one fan-out invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// The dedup marker was already present; nothing was sent.
    Duplicate,
    /// No subscriber passed the eligibility gate; marker written.
    NoRecipients,
    /// Sends were attempted; `succeeded` of `attempted` went through.
    Delivered { attempted: usize, succeeded: usize },
}

/// Deduplicating multi-channel notifier.
pub struct GlitchNotifier {
    broker: Arc<dyn Broker>,
    directory: Arc<dyn SubscriberDirectory>,
    channels: Vec<Arc<dyn NotificationChannel>>,
    dedup_ttl: Duration,
}

impl GlitchNotifier {
    #[must_use]
    pub fn new(
        broker: Arc<dyn Broker>,
        directory: Arc<dyn SubscriberDirectory>,
        channels: Vec<Arc<dyn NotificationChannel>>,
        dedup_ttl: Duration,
    ) -> Self {
        Self {
            broker,
            directory,
            channels,
            dedup_ttl,
        }
    }

    async fn attempt_send(
        channel: Arc<dyn NotificationChannel>,
        glitch: &ConfirmedGlitch,
        subscriber: &Subscriber,
        target: String,
    ) -> ChannelSendResult {
        let sent_at = chrono::Utc::now();
        match channel.send(glitch, &target).await {
            Ok(message_id) => ChannelSendResult {
                channel: channel.kind(),
                subscriber_id: subscriber.id.clone(),
                success: true,
                message_id: Some(message_id),
                error: None,
                sent_at,
            },
            Err(e) => ChannelSendResult {
                channel: channel.kind(),
                subscriber_id: subscriber.id.clone(),
                success: false,
                message_id: None,
                error: Some(e.to_string()),
                sent_at,
            },
        }
    }

    /// Run the dedup gate and fan-out for one confirmed glitch.
    ///
    /// # Errors
    ///
    /// Propagates broker failures (marker reads/writes, roster lookup).
    /// Individual channel failures never surface here; they are folded
    /// into the returned [`NotifyOutcome`].
    pub async fn notify(&self, glitch: &ConfirmedGlitch) -> Result<NotifyOutcome> {
        let key = dedup_key(&glitch.id);
        if self.broker.kv_exists(&key).await? {
            debug!(glitch_id = %glitch.id, "Already notified, skipping");
            return Ok(NotifyOutcome::Duplicate);
        }

        let subscribers = self.directory.realtime_subscribers().await?;
        let eligible: Vec<&Subscriber> = subscribers
            .iter()
            .filter(|s| s.eligible_for(glitch))
            .collect();

        if eligible.is_empty() {
            self.broker
                .kv_set_with_ttl(&key, "1", self.dedup_ttl)
                .await?;
            debug!(glitch_id = %glitch.id, "No eligible recipients");
            return Ok(NotifyOutcome::NoRecipients);
        }

        let mut sends = Vec::new();
        for subscriber in &eligible {
            for channel in &self.channels {
                if let Some(target) = channel.target_for(subscriber) {
                    sends.push(Self::attempt_send(
                        Arc::clone(channel),
                        glitch,
                        subscriber,
                        target,
                    ));
                }
            }
        }

        let results = join_all(sends).await;

        // Marker first, regardless of delivery results: a retry must not
        // re-spam the channels that did succeed.
        self.broker
            .kv_set_with_ttl(&key, "1", self.dedup_ttl)
            .await?;

        let succeeded = results.iter().filter(|r| r.success).count();
        for result in results.iter().filter(|r| !r.success) {
            warn!(
                glitch_id = %glitch.id,
                channel = result.channel,
                subscriber = %result.subscriber_id,
                error = result.error.as_deref().unwrap_or("unknown"),
                "Channel send failed"
            );
        }

        info!(
            glitch_id = %glitch.id,
            attempted = results.len(),
            succeeded,
            "Notification fan-out complete"
        );

        Ok(NotifyOutcome::Delivered {
            attempted: results.len(),
            succeeded,
        })
    }
}

/// Stage B entry handler: parse, dedup, fan out.
pub struct NotificationHandler {
    notifier: Arc<GlitchNotifier>,
}

impl NotificationHandler {
    #[must_use]
    pub fn new(notifier: Arc<GlitchNotifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl EntryHandler for NotificationHandler {
    async fn handle(&self, entry: &StreamEntry) -> std::result::Result<(), HandlerError> {
        let payload = entry
            .payload()
            .ok_or_else(|| HandlerError::Malformed("entry has no payload field".into()))?;
        let glitch: ConfirmedGlitch = serde_json::from_str(payload)
            .map_err(|e| HandlerError::Malformed(format!("undecodable glitch payload: {e}")))?;

        match self.notifier.notify(&glitch).await {
            Ok(NotifyOutcome::Duplicate | NotifyOutcome::NoRecipients) => Ok(()),
            Ok(NotifyOutcome::Delivered { succeeded, .. }) if succeeded > 0 => Ok(()),
            // Every channel failed: no real delivery happened, so the
            // "notified" transition must not commit. The retry will hit
            // the dedup marker and settle as a no-op.
            Ok(NotifyOutcome::Delivered { attempted, .. }) => Err(HandlerError::Transient(
                format!("all {attempted} channel sends failed"),
            )),
            Err(e) => Err(HandlerError::Transient(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::broker::MemoryBroker;
    use crate::adapter::directory::StaticDirectory;
    use crate::testkit::{glitch, subscriber, RecordingChannel};

    fn notifier(
        broker: Arc<MemoryBroker>,
        subscribers: Vec<Subscriber>,
        channels: Vec<Arc<dyn NotificationChannel>>,
    ) -> GlitchNotifier {
        GlitchNotifier::new(
            broker,
            Arc::new(StaticDirectory::new(subscribers)),
            channels,
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn fan_out_reaches_every_configured_channel() {
        let broker = Arc::new(MemoryBroker::new());
        let first = RecordingChannel::new("webhook");
        let second = RecordingChannel::new("telegram");
        let notifier = notifier(
            broker,
            vec![subscriber("sub-1")],
            vec![Arc::new(first.clone()), Arc::new(second.clone())],
        );

        let outcome = notifier.notify(&glitch()).await.unwrap();
        assert_eq!(
            outcome,
            NotifyOutcome::Delivered {
                attempted: 2,
                succeeded: 2
            }
        );
        assert_eq!(first.sent(), 1);
        assert_eq!(second.sent(), 1);
    }

    #[tokio::test]
    async fn second_notify_within_ttl_is_a_no_op() {
        let broker = Arc::new(MemoryBroker::new());
        let channel = RecordingChannel::new("webhook");
        let notifier = notifier(
            broker,
            vec![subscriber("sub-1")],
            vec![Arc::new(channel.clone())],
        );
        let glitch = glitch();

        notifier.notify(&glitch).await.unwrap();
        let outcome = notifier.notify(&glitch).await.unwrap();

        assert_eq!(outcome, NotifyOutcome::Duplicate);
        assert_eq!(channel.sent(), 1);
    }

    #[tokio::test]
    async fn one_failing_channel_does_not_block_the_other() {
        let broker = Arc::new(MemoryBroker::new());
        let healthy = RecordingChannel::new("webhook");
        let broken = RecordingChannel::new("telegram").failing();
        let notifier = notifier(
            broker,
            vec![subscriber("sub-1")],
            vec![Arc::new(broken), Arc::new(healthy.clone())],
        );

        let outcome = notifier.notify(&glitch()).await.unwrap();
        assert_eq!(
            outcome,
            NotifyOutcome::Delivered {
                attempted: 2,
                succeeded: 1
            }
        );
        assert_eq!(healthy.sent(), 1);
    }

    #[tokio::test]
    async fn marker_written_even_when_all_sends_fail() {
        let broker = Arc::new(MemoryBroker::new());
        let broken = RecordingChannel::new("webhook").failing();
        let notifier = notifier(
            broker.clone(),
            vec![subscriber("sub-1")],
            vec![Arc::new(broken.clone())],
        );
        let glitch = glitch();

        let outcome = notifier.notify(&glitch).await.unwrap();
        assert_eq!(
            outcome,
            NotifyOutcome::Delivered {
                attempted: 1,
                succeeded: 0
            }
        );
        assert!(broker.kv_exists(&dedup_key(&glitch.id)).await.unwrap());

        // The retry must not attempt channel sends again.
        let outcome = notifier.notify(&glitch).await.unwrap();
        assert_eq!(outcome, NotifyOutcome::Duplicate);
        assert_eq!(broken.attempts(), 1);
    }

    #[tokio::test]
    async fn ineligible_subscribers_receive_nothing() {
        let broker = Arc::new(MemoryBroker::new());
        let channel = RecordingChannel::new("webhook");
        let mut ineligible = subscriber("sub-1");
        ineligible.preferences.min_profit_margin = 99.0;

        let notifier = notifier(broker, vec![ineligible], vec![Arc::new(channel.clone())]);
        let outcome = notifier.notify(&glitch()).await.unwrap();

        assert_eq!(outcome, NotifyOutcome::NoRecipients);
        assert_eq!(channel.sent(), 0);
    }
}
