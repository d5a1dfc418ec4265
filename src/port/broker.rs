//! Durable stream-store port.
//!
//! The only operations the core requires from the broker: stream append and
//! ordered read, consumer cursors, TTL'd key/value markers, and list
//! push/length for the dead-letter store. Transport is the adapter's
//! concern; every implementation call must resolve within a bounded time
//! (map overruns to [`BrokerError::Timeout`](crate::error::BrokerError)).

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Field key holding the serialized payload document.
pub const FIELD_PAYLOAD: &str = "payload";

/// Field key holding the payload's logical id.
pub const FIELD_LOGICAL_ID: &str = "id";

/// Field key holding the append timestamp (RFC 3339).
pub const FIELD_TIMESTAMP: &str = "ts";

/// Opaque, monotonically increasing entry id assigned by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryId(String);

impl EntryId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A broker-owned stream entry. The core reads entries, never mutates them.
#[derive(Debug, Clone)]
pub struct StreamEntry {
    pub id: EntryId,
    pub fields: HashMap<String, String>,
}

impl StreamEntry {
    /// The serialized payload field, if present.
    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        self.fields.get(FIELD_PAYLOAD).map(String::as_str)
    }
}

/// Minimal durable-store contract consumed by the pipeline.
///
/// Implementations must be thread-safe (`Send + Sync`); consumers and the
/// notification stage share one broker handle across tasks.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Append an entry to `stream`, returning the broker-assigned id.
    async fn append(&self, stream: &str, fields: HashMap<String, String>) -> Result<EntryId>;

    /// Read up to `limit` entries strictly after `after`, in id order.
    /// `None` reads from the beginning of the stream.
    async fn read(
        &self,
        stream: &str,
        after: Option<&EntryId>,
        limit: usize,
    ) -> Result<Vec<StreamEntry>>;

    /// Last-processed entry id for a consumer cursor key.
    async fn get_cursor(&self, key: &str) -> Result<Option<EntryId>>;

    /// Persist a consumer cursor. Each key is owned by exactly one consumer.
    async fn set_cursor(&self, key: &str, id: &EntryId) -> Result<()>;

    /// Set a key with a time-to-live (dedup markers, breaker bookkeeping).
    async fn kv_set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Whether a non-expired value exists for `key`.
    async fn kv_exists(&self, key: &str) -> Result<bool>;

    /// Append a value to a list (dead-letter store).
    async fn list_push(&self, key: &str, value: String) -> Result<()>;

    /// Current length of a list.
    async fn list_len(&self, key: &str) -> Result<usize>;
}

/// Build the standard field set for an appended payload.
#[must_use]
pub fn payload_fields(payload: String, logical_id: &str) -> HashMap<String, String> {
    let mut fields = HashMap::with_capacity(3);
    fields.insert(FIELD_PAYLOAD.to_string(), payload);
    fields.insert(FIELD_LOGICAL_ID.to_string(), logical_id.to_string());
    fields.insert(FIELD_TIMESTAMP.to_string(), chrono::Utc::now().to_rfc3339());
    fields
}
