//! Read-only observability surface.
//!
//! Gathered on demand for an external metrics endpoint to poll; nothing
//! here pushes anywhere.

use serde::Serialize;

use crate::app::consumer::dlq_key_for;
use crate::app::router::ModelRouter;
use crate::error::Result;
use crate::port::broker::Broker;

/// Per-model call/error counters.
#[derive(Debug, Clone, Serialize)]
pub struct ModelMetrics {
    pub id: String,
    pub calls: u64,
    pub errors: u32,
}

/// Dead-letter depth for one stream.
#[derive(Debug, Clone, Serialize)]
pub struct DlqDepth {
    pub stream: String,
    pub depth: usize,
}

/// Point-in-time pipeline counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub models: Vec<ModelMetrics>,
    pub last_model: Option<String>,
    pub sota_calls: u64,
    pub dead_letters: Vec<DlqDepth>,
}

impl MetricsReport {
    /// Collect router counters and dead-letter depths for the given
    /// streams.
    ///
    /// # Errors
    ///
    /// Propagates broker failures reading list lengths.
    pub async fn gather(
        router: Option<&ModelRouter>,
        broker: &dyn Broker,
        streams: &[String],
    ) -> Result<Self> {
        let (models, last_model, sota_calls) = match router {
            Some(router) => {
                let snapshot = router.snapshot();
                let models = snapshot
                    .models
                    .into_iter()
                    .map(|m| ModelMetrics {
                        id: m.id,
                        calls: m.calls,
                        errors: m.errors,
                    })
                    .collect();
                (models, snapshot.last_model, snapshot.sota_calls)
            }
            None => (Vec::new(), None, 0),
        };

        let mut dead_letters = Vec::with_capacity(streams.len());
        for stream in streams {
            let depth = broker.list_len(&dlq_key_for(stream)).await?;
            dead_letters.push(DlqDepth {
                stream: stream.clone(),
                depth,
            });
        }

        Ok(Self {
            models,
            last_model,
            sota_calls,
            dead_letters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::broker::MemoryBroker;

    #[tokio::test]
    async fn gather_reports_dlq_depths_per_stream() {
        let broker = MemoryBroker::new();
        broker
            .list_push(&dlq_key_for("glitch:detected"), "{}".into())
            .await
            .unwrap();
        broker
            .list_push(&dlq_key_for("glitch:detected"), "{}".into())
            .await
            .unwrap();

        let streams = vec!["glitch:detected".to_string(), "glitch:confirmed".to_string()];
        let report = MetricsReport::gather(None, &broker, &streams).await.unwrap();

        assert_eq!(report.dead_letters[0].depth, 2);
        assert_eq!(report.dead_letters[1].depth, 0);
        assert!(report.models.is_empty());
    }
}
