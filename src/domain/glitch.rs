//! Detected and confirmed glitch payloads.
//!
//! These are the two documents that travel the pipeline streams. Both are
//! opaque JSON to the broker; only the producers and stage handlers
//! interpret them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::detection::DetectionResult;
use super::observation::PriceObservation;

/// Payload published to the detected stream by the detection producer and
/// consumed by the validation stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedAnomaly {
    /// Logical id, stable across retries.
    pub id: Uuid,
    pub product_id: String,
    pub title: String,
    pub retailer: String,
    pub category: String,
    pub current_price: f64,
    pub original_price: Option<f64>,
    pub detection: DetectionResult,
    pub detected_at: DateTime<Utc>,
}

impl DetectedAnomaly {
    /// Build the stream payload for an anomalous observation.
    #[must_use]
    pub fn from_observation(observation: &PriceObservation, detection: DetectionResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id: observation.product_id.clone(),
            title: observation.title.clone(),
            retailer: observation.retailer.clone(),
            category: observation.category.clone(),
            current_price: observation.current_price,
            original_price: observation.original_price,
            detection,
            detected_at: Utc::now(),
        }
    }
}

/// Payload published to the confirmed stream by the validation stage and
/// consumed by the notification stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmedGlitch {
    /// Carries the detected anomaly's logical id through the pipeline, so
    /// dedup keys survive validation.
    pub id: Uuid,
    pub product_id: String,
    pub title: String,
    pub retailer: String,
    pub category: String,
    pub price: f64,
    pub original_price: Option<f64>,
    pub discount_percentage: f64,
    /// Validator-assigned confidence, 0-100.
    pub confidence: f64,
    /// Validator's stated reasoning, kept for the notification copy.
    pub reasoning: String,
    pub validated_at: DateTime<Utc>,
}
