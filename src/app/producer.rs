//! Detection producer: the entry point the scraping collaborator calls.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{detect, DetectedAnomaly, PriceObservation};
use crate::error::Result;
use crate::port::broker::{payload_fields, Broker, EntryId};

/// Classifies observations and publishes anomalous ones to the detected
/// stream.
#[derive(Clone)]
pub struct DetectionProducer {
    broker: Arc<dyn Broker>,
    stream: String,
}

impl DetectionProducer {
    #[must_use]
    pub fn new(broker: Arc<dyn Broker>, stream: impl Into<String>) -> Self {
        Self {
            broker,
            stream: stream.into(),
        }
    }

    /// Run detection on one observation; publish when anomalous.
    ///
    /// Returns the appended entry id, or `None` when the observation is
    /// unremarkable.
    ///
    /// # Errors
    ///
    /// Propagates broker append failures.
    pub async fn observe(&self, observation: &PriceObservation) -> Result<Option<EntryId>> {
        let detection = detect(
            observation.current_price,
            observation.original_price,
            &observation.price_history,
        );

        if !detection.is_anomaly {
            debug!(
                product_id = %observation.product_id,
                price = observation.current_price,
                "Observation within normal range"
            );
            return Ok(None);
        }

        let anomaly = DetectedAnomaly::from_observation(observation, detection);
        let payload = serde_json::to_string(&anomaly)?;
        let entry_id = self
            .broker
            .append(
                &self.stream,
                payload_fields(payload, &anomaly.id.to_string()),
            )
            .await?;

        info!(
            anomaly_id = %anomaly.id,
            product_id = %anomaly.product_id,
            anomaly_type = anomaly.detection.anomaly_type.as_str(),
            confidence = anomaly.detection.confidence,
            entry_id = %entry_id,
            "Anomaly published"
        );
        Ok(Some(entry_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::broker::MemoryBroker;
    use crate::testkit::{glitched_observation, stable_history};

    #[tokio::test]
    async fn anomalous_observation_is_published() {
        let broker = Arc::new(MemoryBroker::new());
        let producer = DetectionProducer::new(broker.clone(), "detected");

        let entry_id = producer.observe(&glitched_observation()).await.unwrap();
        assert!(entry_id.is_some());

        let entries = broker.read("detected", None, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].payload().unwrap().contains("mad_score"));
    }

    #[tokio::test]
    async fn normal_observation_is_not_published() {
        let broker = Arc::new(MemoryBroker::new());
        let producer = DetectionProducer::new(broker.clone(), "detected");

        let mut observation = glitched_observation();
        observation.current_price = 195.0;
        observation.original_price = Some(199.99);
        observation.price_history = stable_history();

        let entry_id = producer.observe(&observation).await.unwrap();
        assert!(entry_id.is_none());
        assert!(broker.read("detected", None, 10).await.unwrap().is_empty());
    }
}
