//! In-memory broker implementation.
//!
//! Backs tests and single-process deployments. Entry ids follow the
//! `<sequence>-0` convention so cursors read naturally in logs; ordering is
//! by sequence number, not lexicographic. TTL'd keys expire lazily on read.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{BrokerError, Result};
use crate::port::broker::{Broker, EntryId, StreamEntry};

#[derive(Default)]
struct Inner {
    streams: HashMap<String, Stream>,
    cursors: HashMap<String, EntryId>,
    kv: HashMap<String, (String, Instant)>,
    lists: HashMap<String, Vec<String>>,
}

#[derive(Default)]
struct Stream {
    next_seq: u64,
    entries: Vec<(u64, StreamEntry)>,
}

/// In-process broker; cheap to construct per test.
#[derive(Default)]
pub struct MemoryBroker {
    inner: RwLock<Inner>,
}

impl MemoryBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_seq(id: &EntryId) -> Result<u64> {
        id.as_str()
            .split('-')
            .next()
            .and_then(|seq| seq.parse().ok())
            .ok_or_else(|| BrokerError::MalformedEntryId(id.to_string()).into())
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn append(&self, stream: &str, fields: HashMap<String, String>) -> Result<EntryId> {
        let mut inner = self.inner.write();
        let stream = inner.streams.entry(stream.to_string()).or_default();
        let seq = stream.next_seq;
        stream.next_seq += 1;

        let id = EntryId::new(format!("{seq}-0"));
        stream.entries.push((
            seq,
            StreamEntry {
                id: id.clone(),
                fields,
            },
        ));
        Ok(id)
    }

    async fn read(
        &self,
        stream: &str,
        after: Option<&EntryId>,
        limit: usize,
    ) -> Result<Vec<StreamEntry>> {
        let after_seq = match after {
            Some(id) => Some(Self::parse_seq(id)?),
            None => None,
        };

        let inner = self.inner.read();
        let Some(stream) = inner.streams.get(stream) else {
            return Ok(Vec::new());
        };

        Ok(stream
            .entries
            .iter()
            .filter(|(seq, _)| after_seq.map_or(true, |after| *seq > after))
            .take(limit)
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    async fn get_cursor(&self, key: &str) -> Result<Option<EntryId>> {
        Ok(self.inner.read().cursors.get(key).cloned())
    }

    async fn set_cursor(&self, key: &str, id: &EntryId) -> Result<()> {
        self.inner.write().cursors.insert(key.to_string(), id.clone());
        Ok(())
    }

    async fn kv_set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.inner
            .write()
            .kv
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn kv_exists(&self, key: &str) -> Result<bool> {
        // Lazy expiry: prune on read rather than with a timer.
        let mut inner = self.inner.write();
        match inner.kv.get(key) {
            Some((_, expires)) if *expires > Instant::now() => Ok(true),
            Some(_) => {
                inner.kv.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn list_push(&self, key: &str, value: String) -> Result<()> {
        self.inner
            .write()
            .lists
            .entry(key.to_string())
            .or_default()
            .push(value);
        Ok(())
    }

    async fn list_len(&self, key: &str) -> Result<usize> {
        Ok(self.inner.read().lists.get(key).map_or(0, Vec::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::broker::payload_fields;

    #[tokio::test]
    async fn append_assigns_monotonic_ids() {
        let broker = MemoryBroker::new();

        let first = broker
            .append("s", payload_fields("{}".into(), "a"))
            .await
            .unwrap();
        let second = broker
            .append("s", payload_fields("{}".into(), "b"))
            .await
            .unwrap();

        assert_eq!(first.as_str(), "0-0");
        assert_eq!(second.as_str(), "1-0");
    }

    #[tokio::test]
    async fn read_after_cursor_skips_processed_entries() {
        let broker = MemoryBroker::new();
        for i in 0..5 {
            broker
                .append("s", payload_fields(format!("{{\"n\":{i}}}"), "x"))
                .await
                .unwrap();
        }

        let all = broker.read("s", None, 10).await.unwrap();
        assert_eq!(all.len(), 5);

        let tail = broker.read("s", Some(&all[1].id), 10).await.unwrap();
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0].id.as_str(), "2-0");
    }

    #[tokio::test]
    async fn read_honors_limit() {
        let broker = MemoryBroker::new();
        for _ in 0..5 {
            broker
                .append("s", payload_fields("{}".into(), "x"))
                .await
                .unwrap();
        }

        let batch = broker.read("s", None, 2).await.unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn read_unknown_stream_is_empty() {
        let broker = MemoryBroker::new();
        assert!(broker.read("missing", None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_rejects_malformed_cursor() {
        let broker = MemoryBroker::new();
        broker
            .append("s", payload_fields("{}".into(), "x"))
            .await
            .unwrap();

        let bad = EntryId::new("not-a-seq");
        assert!(broker.read("s", Some(&bad), 10).await.is_err());
    }

    #[tokio::test]
    async fn cursors_round_trip() {
        let broker = MemoryBroker::new();
        assert!(broker.get_cursor("c").await.unwrap().is_none());

        broker.set_cursor("c", &EntryId::new("3-0")).await.unwrap();
        assert_eq!(broker.get_cursor("c").await.unwrap().unwrap().as_str(), "3-0");
    }

    #[tokio::test]
    async fn kv_markers_expire() {
        let broker = MemoryBroker::new();
        broker
            .kv_set_with_ttl("m", "1", Duration::from_millis(20))
            .await
            .unwrap();
        assert!(broker.kv_exists("m").await.unwrap());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!broker.kv_exists("m").await.unwrap());
    }

    #[tokio::test]
    async fn lists_track_length() {
        let broker = MemoryBroker::new();
        assert_eq!(broker.list_len("dlq").await.unwrap(), 0);

        broker.list_push("dlq", "a".into()).await.unwrap();
        broker.list_push("dlq", "b".into()).await.unwrap();
        assert_eq!(broker.list_len("dlq").await.unwrap(), 2);
    }
}
