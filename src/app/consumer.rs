//! Generic at-least-once stream consumer.
//!
//! Both pipeline stages run this loop: read cursor, fetch a batch strictly
//! after it, process entries in order, advance the cursor per entry. A
//! transient handler failure stops the batch without advancing so the same
//! entry is retried next cycle: strict per-stream ordering at the cost of
//! head-of-line blocking. Entries that exhaust their retry budget go to the
//! dead-letter list and the stream moves on.
//!
//! Failure tallies are process-local: a consumer restart resets retry
//! counts but not the cursor, so a previously failing entry gets a fresh
//! budget after a crash. Deliberate tradeoff: it favors eventual progress
//! over strict budget enforcement; the max-retry bound holds only within a
//! single process lifetime.
//!
//! At most one consumer instance may run per (stream, cursor key) pair;
//! that exclusivity is deployment discipline, not something this framework
//! can enforce.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::ConsumerSettings;
use crate::error::{HandlerError, Result};
use crate::port::broker::{Broker, StreamEntry};

/// Per-entry processing callback.
///
/// Return `Ok(())` on success, [`HandlerError::Malformed`] for unusable
/// payloads (skipped, cursor advances), and [`HandlerError::Transient`]
/// for failures worth retrying.
#[async_trait]
pub trait EntryHandler: Send + Sync {
    async fn handle(&self, entry: &StreamEntry) -> std::result::Result<(), HandlerError>;
}

/// Consumer instance configuration.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Stage name for logs.
    pub name: &'static str,
    pub stream: String,
    pub cursor_key: String,
    pub batch_size: usize,
    pub poll_interval: Duration,
    pub max_retries: u32,
    /// Dead-letter list key.
    pub dlq_key: String,
}

impl ConsumerConfig {
    /// Build a stage config from the config-file settings.
    #[must_use]
    pub fn from_settings(name: &'static str, stream: &str, settings: &ConsumerSettings) -> Self {
        Self {
            name,
            stream: stream.to_string(),
            cursor_key: settings.cursor_key.clone(),
            batch_size: settings.batch_size,
            poll_interval: settings.poll_interval(),
            max_retries: settings.max_retries,
            dlq_key: dlq_key_for(stream),
        }
    }
}

/// Dead-letter list key for a stream.
#[must_use]
pub fn dlq_key_for(stream: &str) -> String {
    format!("dlq:{stream}")
}

/// Record appended to the dead-letter list for a permanently failed entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqEntry {
    pub stream: String,
    pub entry_id: String,
    pub payload: String,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

/// A single-stage consumer loop over one stream and one cursor.
pub struct StreamConsumer {
    broker: Arc<dyn Broker>,
    handler: Arc<dyn EntryHandler>,
    config: ConsumerConfig,
    /// Consecutive-failure counts per entry id, this process only.
    tallies: HashMap<String, u32>,
}

impl StreamConsumer {
    #[must_use]
    pub fn new(
        broker: Arc<dyn Broker>,
        handler: Arc<dyn EntryHandler>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            broker,
            handler,
            config,
            tallies: HashMap::new(),
        }
    }

    /// Run until the shutdown signal flips.
    ///
    /// Shutdown is cooperative: the signal is observed at the poll-sleep
    /// boundary, so an in-flight entry always finishes before the loop
    /// exits and the cursor never disagrees with a half-processed entry.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            consumer = self.config.name,
            stream = %self.config.stream,
            cursor_key = %self.config.cursor_key,
            "Consumer started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            if let Err(e) = self.poll_once().await {
                // Broker trouble is transient by definition here; back off
                // one poll interval and try again.
                warn!(
                    consumer = self.config.name,
                    error = %e,
                    "Poll cycle failed"
                );
            }

            tokio::select! {
                () = tokio::time::sleep(self.config.poll_interval) => {}
                _ = shutdown.changed() => {}
            }
        }

        info!(consumer = self.config.name, "Consumer stopped");
    }

    /// One poll cycle: fetch a batch after the cursor and process it in
    /// order. Returns how many entries the cursor advanced past.
    ///
    /// # Errors
    ///
    /// Propagates broker failures (cursor reads/writes, fetches, DLQ
    /// writes); the caller retries the whole cycle.
    pub async fn poll_once(&mut self) -> Result<usize> {
        let cursor = self.broker.get_cursor(&self.config.cursor_key).await?;
        let batch = self
            .broker
            .read(&self.config.stream, cursor.as_ref(), self.config.batch_size)
            .await?;

        if batch.is_empty() {
            return Ok(0);
        }

        let mut advanced = 0;
        for entry in &batch {
            match self.handler.handle(entry).await {
                Ok(()) => {
                    self.tallies.remove(entry.id.as_str());
                    self.advance(entry).await?;
                    advanced += 1;
                }
                Err(HandlerError::Malformed(reason)) => {
                    // Poison entries must not stall the stream.
                    warn!(
                        consumer = self.config.name,
                        entry_id = %entry.id,
                        reason = %reason,
                        "Skipping malformed entry"
                    );
                    self.tallies.remove(entry.id.as_str());
                    self.advance(entry).await?;
                    advanced += 1;
                }
                Err(HandlerError::Transient(reason)) => {
                    let tally = self
                        .tallies
                        .entry(entry.id.as_str().to_string())
                        .or_insert(0);
                    *tally += 1;

                    if *tally < self.config.max_retries {
                        debug!(
                            consumer = self.config.name,
                            entry_id = %entry.id,
                            attempt = *tally,
                            max_retries = self.config.max_retries,
                            reason = %reason,
                            "Entry failed, will retry next cycle"
                        );
                        // Stop the batch without advancing: the retried
                        // entry blocks everything behind it, preserving
                        // order.
                        break;
                    }

                    error!(
                        consumer = self.config.name,
                        entry_id = %entry.id,
                        attempts = *tally,
                        reason = %reason,
                        "Retry budget exhausted, dead-lettering entry"
                    );
                    self.dead_letter(entry, &reason).await?;
                    self.tallies.remove(entry.id.as_str());
                    self.advance(entry).await?;
                    advanced += 1;
                }
            }
        }

        Ok(advanced)
    }

    async fn advance(&self, entry: &StreamEntry) -> Result<()> {
        self.broker
            .set_cursor(&self.config.cursor_key, &entry.id)
            .await
    }

    async fn dead_letter(&self, entry: &StreamEntry, reason: &str) -> Result<()> {
        let record = DlqEntry {
            stream: self.config.stream.clone(),
            entry_id: entry.id.to_string(),
            payload: entry.payload().unwrap_or_default().to_string(),
            error: reason.to_string(),
            failed_at: Utc::now(),
        };
        self.broker
            .list_push(&self.config.dlq_key, serde_json::to_string(&record)?)
            .await
    }
}
