//! Scripted [`EntryHandler`] implementations for consumer tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::app::consumer::EntryHandler;
use crate::error::HandlerError;
use crate::port::broker::StreamEntry;

/// Fails transiently a fixed number of times, then succeeds forever.
/// Clones share counters.
#[derive(Clone)]
pub struct FlakyHandler {
    remaining_failures: Arc<AtomicU32>,
    attempts: Arc<AtomicU32>,
}

impl FlakyHandler {
    #[must_use]
    pub fn failing_times(failures: u32) -> Self {
        Self {
            remaining_failures: Arc::new(AtomicU32::new(failures)),
            attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntryHandler for FlakyHandler {
    async fn handle(&self, _entry: &StreamEntry) -> Result<(), HandlerError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let failed = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            Err(HandlerError::Transient("scripted transient failure".into()))
        } else {
            Ok(())
        }
    }
}

/// Records successfully handled payloads; fails transiently for one
/// payload a fixed number of times first. Clones share state.
#[derive(Clone)]
pub struct SelectiveHandler {
    poison_payload: String,
    remaining_failures: Arc<AtomicU32>,
    processed: Arc<Mutex<Vec<String>>>,
}

impl SelectiveHandler {
    /// Fail `failures` times whenever the entry payload equals
    /// `poison_payload`; process everything else immediately.
    #[must_use]
    pub fn poisoning(poison_payload: impl Into<String>, failures: u32) -> Self {
        Self {
            poison_payload: poison_payload.into(),
            remaining_failures: Arc::new(AtomicU32::new(failures)),
            processed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Payloads in successful processing order.
    #[must_use]
    pub fn processed(&self) -> Vec<String> {
        self.processed.lock().clone()
    }
}

#[async_trait]
impl EntryHandler for SelectiveHandler {
    async fn handle(&self, entry: &StreamEntry) -> Result<(), HandlerError> {
        let payload = entry.payload().unwrap_or_default().to_string();

        if payload == self.poison_payload {
            let failed = self
                .remaining_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failed {
                return Err(HandlerError::Transient(
                    "scripted failure for poisoned payload".into(),
                ));
            }
        }

        self.processed.lock().push(payload);
        Ok(())
    }
}
