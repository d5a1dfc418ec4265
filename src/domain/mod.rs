//! Broker-agnostic domain types and pure detection logic.

pub mod detection;
pub mod glitch;
pub mod observation;
pub mod stats;
pub mod subscriber;

pub use detection::{detect, AnomalyType, DetectionResult};
pub use glitch::{ConfirmedGlitch, DetectedAnomaly};
pub use observation::PriceObservation;
pub use subscriber::{NotificationPreferences, NotificationTargets, Subscriber};
