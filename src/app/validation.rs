//! Detection-validation stage.
//!
//! Consumes the detected stream, asks the AI validator for a second
//! opinion, and publishes confirmed glitches to the confirmed stream.
//! Rejections are final successful outcomes; validator failures are
//! transient and ride the consumer's retry policy.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

use crate::app::consumer::EntryHandler;
use crate::app::router::{EscalationSignals, ModelRouter};
use crate::domain::{ConfirmedGlitch, DetectedAnomaly};
use crate::error::{HandlerError, Result, RouterError};
use crate::port::broker::{payload_fields, Broker, StreamEntry};
use crate::port::llm::ChatMessage;
use crate::port::validator::GlitchValidator;

const SYSTEM_PROMPT: &str = "You are a pricing analyst verifying suspected price glitches. \
Judge whether the listed price is a genuine pricing error rather than a sale, \
clearance, refurbished listing, or data problem. Respond with a single JSON object: \
{\"confirmed\": bool, \"confidence\": number 0-100, \"reasoning\": string}. \
No markdown, no prose outside the JSON.";

/// Validator verdict as returned by the model.
#[derive(Debug, Deserialize)]
struct Verdict {
    confirmed: bool,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

/// [`GlitchValidator`] backed by the model router.
pub struct LlmValidator {
    router: Arc<ModelRouter>,
}

impl LlmValidator {
    #[must_use]
    pub fn new(router: Arc<ModelRouter>) -> Self {
        Self { router }
    }

    fn prompt(anomaly: &DetectedAnomaly) -> Vec<ChatMessage> {
        let detection = &anomaly.detection;
        let user = format!(
            "Product: {title}\nRetailer: {retailer}\nCategory: {category}\n\
             Current price: {price:.2}\nOriginal price: {original}\n\
             Detector signal: {signal} (discount {discount:.1}%, MAD {mad:.2}, \
             z-score {z:.2}, confidence {confidence:.0})",
            title = anomaly.title,
            retailer = anomaly.retailer,
            category = anomaly.category,
            price = anomaly.current_price,
            original = anomaly
                .original_price
                .map_or_else(|| "unknown".to_string(), |p| format!("{p:.2}")),
            signal = detection.anomaly_type.as_str(),
            discount = detection.discount_percentage,
            mad = detection.mad_score,
            z = detection.z_score,
            confidence = detection.confidence,
        );

        vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
    }

    /// Parse the model's JSON verdict, tolerating fenced code blocks.
    fn parse_verdict(content: &str) -> Result<Verdict> {
        let trimmed = content.trim();
        let stripped = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .and_then(|s| s.strip_suffix("```"))
            .unwrap_or(trimmed)
            .trim();

        serde_json::from_str(stripped)
            .map_err(|e| RouterError::BadResponse(format!("verdict parse failed: {e}")).into())
    }
}

#[async_trait]
impl GlitchValidator for LlmValidator {
    async fn validate(&self, anomaly: &DetectedAnomaly) -> Result<Option<ConfirmedGlitch>> {
        let signals = EscalationSignals::from(anomaly);
        let completion = self
            .router
            .complete(Self::prompt(anomaly), true, Some(&signals))
            .await?;

        let verdict = Self::parse_verdict(&completion.content)?;
        if !verdict.confirmed {
            debug!(
                anomaly_id = %anomaly.id,
                product_id = %anomaly.product_id,
                reasoning = %verdict.reasoning,
                "Validator rejected anomaly"
            );
            return Ok(None);
        }

        Ok(Some(ConfirmedGlitch {
            id: anomaly.id,
            product_id: anomaly.product_id.clone(),
            title: anomaly.title.clone(),
            retailer: anomaly.retailer.clone(),
            category: anomaly.category.clone(),
            price: anomaly.current_price,
            original_price: anomaly.original_price,
            discount_percentage: anomaly.detection.discount_percentage,
            confidence: verdict.confidence.clamp(0.0, 100.0),
            reasoning: verdict.reasoning,
            validated_at: Utc::now(),
        }))
    }
}

/// Stage A entry handler: parse, validate, publish.
pub struct ValidationHandler {
    broker: Arc<dyn Broker>,
    validator: Arc<dyn GlitchValidator>,
    confirmed_stream: String,
}

impl ValidationHandler {
    #[must_use]
    pub fn new(
        broker: Arc<dyn Broker>,
        validator: Arc<dyn GlitchValidator>,
        confirmed_stream: impl Into<String>,
    ) -> Self {
        Self {
            broker,
            validator,
            confirmed_stream: confirmed_stream.into(),
        }
    }
}

#[async_trait]
impl EntryHandler for ValidationHandler {
    async fn handle(&self, entry: &StreamEntry) -> std::result::Result<(), HandlerError> {
        let payload = entry
            .payload()
            .ok_or_else(|| HandlerError::Malformed("entry has no payload field".into()))?;
        let anomaly: DetectedAnomaly = serde_json::from_str(payload)
            .map_err(|e| HandlerError::Malformed(format!("undecodable anomaly payload: {e}")))?;

        match self.validator.validate(&anomaly).await {
            Ok(Some(glitch)) => {
                let json = serde_json::to_string(&glitch)
                    .map_err(|e| HandlerError::Transient(e.to_string()))?;
                self.broker
                    .append(
                        &self.confirmed_stream,
                        payload_fields(json, &glitch.id.to_string()),
                    )
                    .await
                    .map_err(|e| HandlerError::Transient(e.to_string()))?;

                info!(
                    glitch_id = %glitch.id,
                    product_id = %glitch.product_id,
                    confidence = glitch.confidence,
                    "Glitch confirmed"
                );
                Ok(())
            }
            Ok(None) => Ok(()),
            // Permanent model failure from the router counts as transient
            // here; the consumer owns the retry budget.
            Err(e) => Err(HandlerError::Transient(e.to_string())),
        }
    }
}
