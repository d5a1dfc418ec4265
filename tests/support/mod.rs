//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use glitchwatch::adapter::broker::MemoryBroker;
use glitchwatch::app::consumer::ConsumerConfig;
use glitchwatch::config::{Config, ModelConfig, ModelTier};
use glitchwatch::domain::DetectedAnomaly;
use glitchwatch::port::broker::{payload_fields, Broker};

/// Consumer config tuned for fast tests.
pub fn consumer_config(stream: &str, max_retries: u32) -> ConsumerConfig {
    ConsumerConfig {
        name: "test",
        stream: stream.to_string(),
        cursor_key: format!("cursor:{stream}"),
        batch_size: 10,
        poll_interval: Duration::from_millis(5),
        max_retries,
        dlq_key: format!("dlq:{stream}"),
    }
}

/// Pipeline config with millisecond poll intervals.
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.validation.poll_interval_ms = 10;
    config.notification.poll_interval_ms = 10;
    config
}

/// Standard-tier model entry.
pub fn standard_model(id: &str, weight: u32) -> ModelConfig {
    ModelConfig {
        id: id.to_string(),
        weight,
        tier: ModelTier::Standard,
        input_cost_per_mtok: 0.0,
        output_cost_per_mtok: 0.0,
    }
}

/// Sota-tier model entry.
pub fn sota_model(id: &str, weight: u32) -> ModelConfig {
    ModelConfig {
        id: id.to_string(),
        weight,
        tier: ModelTier::Sota,
        input_cost_per_mtok: 3.0,
        output_cost_per_mtok: 15.0,
    }
}

/// Append a detected-anomaly payload to a stream.
pub async fn publish_anomaly(broker: &Arc<MemoryBroker>, stream: &str, anomaly: &DetectedAnomaly) {
    let payload = serde_json::to_string(anomaly).unwrap();
    broker
        .append(stream, payload_fields(payload, &anomaly.id.to_string()))
        .await
        .unwrap();
}

/// Append an opaque payload to a stream.
pub async fn publish_raw(broker: &Arc<MemoryBroker>, stream: &str, payload: &str) {
    broker
        .append(stream, payload_fields(payload.to_string(), "raw"))
        .await
        .unwrap();
}
