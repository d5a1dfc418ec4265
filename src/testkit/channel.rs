//! Recording [`NotificationChannel`] mock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::domain::{ConfirmedGlitch, Subscriber};
use crate::error::{Error, Result};
use crate::port::channel::NotificationChannel;

/// A channel that records sends instead of delivering them.
///
/// Targets every subscriber (the subscriber id doubles as the delivery
/// target), so eligibility filtering is the only gate under test. Clones
/// share counters.
#[derive(Clone)]
pub struct RecordingChannel {
    kind: &'static str,
    fail: bool,
    attempts: Arc<AtomicU32>,
    delivered: Arc<Mutex<Vec<(String, Uuid)>>>,
}

impl RecordingChannel {
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            fail: false,
            attempts: Arc::new(AtomicU32::new(0)),
            delivered: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make every send fail.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Number of successful deliveries.
    #[must_use]
    pub fn sent(&self) -> usize {
        self.delivered.lock().len()
    }

    /// Total send attempts, including failures.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// (target, glitch id) pairs in delivery order.
    #[must_use]
    pub fn deliveries(&self) -> Vec<(String, Uuid)> {
        self.delivered.lock().clone()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn target_for(&self, subscriber: &Subscriber) -> Option<String> {
        Some(subscriber.id.clone())
    }

    async fn send(&self, glitch: &ConfirmedGlitch, target: &str) -> Result<String> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        if self.fail {
            return Err(Error::ChannelSend("scripted channel failure".into()));
        }

        self.delivered.lock().push((target.to_string(), glitch.id));
        Ok(format!("msg-{attempt}"))
    }
}
