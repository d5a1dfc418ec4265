//! Scripted [`GlitchValidator`] implementations.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{ConfirmedGlitch, DetectedAnomaly};
use crate::error::{Error, Result};
use crate::port::validator::GlitchValidator;

fn confirm(anomaly: &DetectedAnomaly) -> ConfirmedGlitch {
    ConfirmedGlitch {
        id: anomaly.id,
        product_id: anomaly.product_id.clone(),
        title: anomaly.title.clone(),
        retailer: anomaly.retailer.clone(),
        category: anomaly.category.clone(),
        price: anomaly.current_price,
        original_price: anomaly.original_price,
        discount_percentage: anomaly.detection.discount_percentage,
        confidence: 90.0,
        reasoning: "scripted confirmation".into(),
        validated_at: Utc::now(),
    }
}

/// Confirms or rejects every anomaly, optionally failing transiently a
/// fixed number of times first. Clones share counters.
#[derive(Clone)]
pub struct ScriptedValidator {
    confirms: bool,
    remaining_failures: Arc<AtomicU32>,
    calls: Arc<AtomicU32>,
}

impl ScriptedValidator {
    #[must_use]
    pub fn confirming() -> Self {
        Self {
            confirms: true,
            remaining_failures: Arc::new(AtomicU32::new(0)),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    #[must_use]
    pub fn rejecting() -> Self {
        Self {
            confirms: false,
            ..Self::confirming()
        }
    }

    /// Fail the first `failures` calls before settling on the scripted
    /// verdict.
    #[must_use]
    pub fn failing_times(mut self, failures: u32) -> Self {
        self.remaining_failures = Arc::new(AtomicU32::new(failures));
        self
    }

    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GlitchValidator for ScriptedValidator {
    async fn validate(&self, anomaly: &DetectedAnomaly) -> Result<Option<ConfirmedGlitch>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let failed = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(Error::Connection("scripted validator failure".into()));
        }

        Ok(self.confirms.then(|| confirm(anomaly)))
    }
}
