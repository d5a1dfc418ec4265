//! AI validator port for the validation stage.

use async_trait::async_trait;

use crate::domain::{ConfirmedGlitch, DetectedAnomaly};
use crate::error::Result;

/// Second-opinion check on a detected anomaly.
///
/// `Ok(Some(..))` confirms the glitch, `Ok(None)` rejects it, and `Err`
/// signals a transient validator failure the consumer should retry.
#[async_trait]
pub trait GlitchValidator: Send + Sync {
    async fn validate(&self, anomaly: &DetectedAnomaly) -> Result<Option<ConfirmedGlitch>>;
}
