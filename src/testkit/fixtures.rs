//! Canonical domain fixtures for tests.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    detect, ConfirmedGlitch, DetectedAnomaly, NotificationPreferences, NotificationTargets,
    PriceObservation, Subscriber,
};

/// An eligible subscriber with wide-open preferences and no channel
/// targets configured.
#[must_use]
pub fn subscriber(id: &str) -> Subscriber {
    Subscriber {
        id: id.to_string(),
        active: true,
        realtime: true,
        preferences: NotificationPreferences::default(),
        targets: NotificationTargets::default(),
    }
}

/// A confirmed 80%-off electronics glitch.
#[must_use]
pub fn glitch() -> ConfirmedGlitch {
    ConfirmedGlitch {
        id: Uuid::new_v4(),
        product_id: "sku-1".into(),
        title: "Wireless Headphones".into(),
        retailer: "amazon".into(),
        category: "electronics".into(),
        price: 120.0,
        original_price: Some(600.0),
        discount_percentage: 80.0,
        confidence: 88.0,
        reasoning: "price far below 90-day history".into(),
        validated_at: Utc::now(),
    }
}

/// Fifteen prices clustered around $195.
#[must_use]
pub fn stable_history() -> Vec<f64> {
    vec![
        190.0, 195.0, 198.0, 205.0, 192.0, 196.0, 194.0, 199.0, 193.0, 197.0, 195.0, 196.0, 194.5,
        195.5, 196.5,
    ]
}

/// An observation whose price collapsed well below its history.
#[must_use]
pub fn glitched_observation() -> PriceObservation {
    PriceObservation {
        product_id: "sku-1".into(),
        title: "Wireless Headphones".into(),
        retailer: "amazon".into(),
        category: "electronics".into(),
        current_price: 9.99,
        original_price: Some(199.99),
        price_history: stable_history(),
    }
}

/// The detected-stream payload for [`glitched_observation`].
#[must_use]
pub fn detected_anomaly() -> DetectedAnomaly {
    let observation = glitched_observation();
    let detection = detect(
        observation.current_price,
        observation.original_price,
        &observation.price_history,
    );
    DetectedAnomaly::from_observation(&observation, detection)
}
