//! Cost-tiered model routing.
//!
//! Picks a backing model per completion request: weighted-random over the
//! standard tier for routine validations, escalating to the sota tier when
//! the unicorn predicate says the detection is valuable enough to pay for.
//! Flaky models are routed around via a three-strike circuit that heals by
//! lazy time-decay, and every failed call gets exactly one fallback attempt
//! before the error propagates; retry budgets belong to the stream
//! consumer, not the router.
//!
//! Router state is process-wide and never persisted: a restart resets
//! routing history but not the catalog.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, warn};

use crate::config::{ModelConfig, ModelTier, RouterConfig};
use crate::domain::{AnomalyType, DetectedAnomaly};
use crate::error::{Result, RouterError};
use crate::port::llm::{ChatCompletion, ChatMessage, Completion, CompletionRequest};

/// Consecutive errors at which a model's circuit opens.
const CIRCUIT_THRESHOLD: u32 = 3;

/// Detection signals the escalation predicate evaluates.
#[derive(Debug, Clone, Default)]
pub struct EscalationSignals {
    pub discount_percentage: f64,
    pub z_score: f64,
    pub price: f64,
    pub original_price: f64,
    /// Upstream detector confidence, 0-100.
    pub initial_confidence: f64,
    pub anomaly_type: Option<AnomalyType>,
}

impl From<&DetectedAnomaly> for EscalationSignals {
    fn from(anomaly: &DetectedAnomaly) -> Self {
        Self {
            discount_percentage: anomaly.detection.discount_percentage,
            z_score: anomaly.detection.z_score,
            price: anomaly.current_price,
            original_price: anomaly.original_price.unwrap_or(0.0),
            initial_confidence: anomaly.detection.confidence,
            anomaly_type: Some(anomaly.detection.anomaly_type),
        }
    }
}

#[derive(Debug, Default)]
struct ModelStats {
    calls: u64,
    errors: u32,
    last_error: Option<Instant>,
}

impl ModelStats {
    /// Error count with lazy decay applied: one error is forgiven per
    /// elapsed cooldown window, so transient blips self-heal without a
    /// timer.
    fn effective_errors(&self, cooldown: Duration) -> u32 {
        match self.last_error {
            Some(at) if self.errors > 0 && !cooldown.is_zero() => {
                let windows = (at.elapsed().as_secs() / cooldown.as_secs().max(1)) as u32;
                self.errors.saturating_sub(windows)
            }
            _ => self.errors,
        }
    }
}

/// Observable per-model counters.
#[derive(Debug, Clone)]
pub struct ModelCounters {
    pub id: String,
    pub calls: u64,
    pub errors: u32,
}

/// Point-in-time view of router state.
#[derive(Debug, Clone)]
pub struct RouterSnapshot {
    pub models: Vec<ModelCounters>,
    pub last_model: Option<String>,
    pub sota_calls: u64,
}

/// Weighted model selector with circuit breaking and tiered escalation.
pub struct ModelRouter {
    standard: Vec<ModelConfig>,
    sota: Vec<ModelConfig>,
    client: Arc<dyn ChatCompletion>,
    temperature: f64,
    cooldown: Duration,
    stats: DashMap<String, ModelStats>,
    last_model: Mutex<Option<String>>,
    sota_calls: AtomicU64,
}

impl ModelRouter {
    /// Build a router over the configured catalog.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::EmptyTier`] when the catalog has no
    /// standard-tier model, a fatal startup condition.
    pub fn new(config: &RouterConfig, client: Arc<dyn ChatCompletion>) -> Result<Self> {
        let standard: Vec<ModelConfig> = config
            .models
            .iter()
            .filter(|m| m.tier == ModelTier::Standard)
            .cloned()
            .collect();
        let sota: Vec<ModelConfig> = config
            .models
            .iter()
            .filter(|m| m.tier == ModelTier::Sota)
            .cloned()
            .collect();

        if standard.is_empty() {
            return Err(RouterError::EmptyTier { tier: "standard" }.into());
        }

        Ok(Self {
            standard,
            sota,
            client,
            temperature: config.temperature,
            cooldown: config.error_cooldown(),
            stats: DashMap::new(),
            last_model: Mutex::new(None),
            sota_calls: AtomicU64::new(0),
        })
    }

    /// Whether a detection is valuable enough to pay for a sota model.
    ///
    /// Pure predicate, no counters: a gate, not a side effect.
    #[must_use]
    pub fn is_unicorn(signals: &EscalationSignals) -> bool {
        if signals.discount_percentage > 85.0 && signals.initial_confidence > 70.0 {
            return true;
        }
        if signals.z_score > 4.5 {
            return true;
        }
        if signals.original_price > 500.0 && signals.discount_percentage > 70.0 {
            return true;
        }
        if signals.anomaly_type == Some(AnomalyType::DecimalError) {
            return true;
        }
        // A 10x price ratio in either direction is itself a decimal-error
        // signature, whatever the detector labeled it.
        if signals.original_price > 0.0 && signals.price > 0.0 {
            let ratio = signals.original_price / signals.price;
            if ratio >= 10.0 || ratio <= 0.1 {
                return true;
            }
        }
        false
    }

    fn circuit_open(&self, model_id: &str) -> bool {
        self.stats
            .get(model_id)
            .map_or(false, |s| s.effective_errors(self.cooldown) >= CIRCUIT_THRESHOLD)
    }

    /// Roulette-wheel draw: `r` uniform in `[0, total_weight)`, first model
    /// whose cumulative weight exceeds `r` wins.
    fn weighted_draw(models: &[ModelConfig]) -> usize {
        let total: u32 = models.iter().map(|m| m.weight).sum();
        let r = rand::thread_rng().gen_range(0..total);

        let mut cumulative = 0;
        for (index, model) in models.iter().enumerate() {
            cumulative += model.weight;
            if cumulative > r {
                return index;
            }
        }
        models.len() - 1
    }

    fn select_from(&self, models: &[ModelConfig]) -> usize {
        let drawn = Self::weighted_draw(models);
        if !self.circuit_open(&models[drawn].id) {
            return drawn;
        }

        // Circuit open: substitute the next model in catalog order
        // (wrap-around) rather than re-drawing.
        for offset in 1..models.len() {
            let candidate = (drawn + offset) % models.len();
            if !self.circuit_open(&models[candidate].id) {
                debug!(
                    drawn = %models[drawn].id,
                    substitute = %models[candidate].id,
                    "Circuit open, substituting model"
                );
                return candidate;
            }
        }

        // Every circuit is open; the drawn model is as good as any.
        warn!("All model circuits open, using drawn model anyway");
        drawn
    }

    /// Weighted draw over the standard tier, skipping open circuits.
    #[must_use]
    pub fn select_standard(&self) -> &ModelConfig {
        &self.standard[self.select_from(&self.standard)]
    }

    /// Weighted draw over the sota tier; falls back to the standard tier
    /// when no sota models are configured. Bumps the sota-call counter.
    #[must_use]
    pub fn select_sota(&self) -> &ModelConfig {
        if self.sota.is_empty() {
            return self.select_standard();
        }
        self.sota_calls.fetch_add(1, Ordering::Relaxed);
        &self.sota[self.select_from(&self.sota)]
    }

    fn record_call(&self, model_id: &str) {
        self.stats.entry(model_id.to_string()).or_default().calls += 1;
        *self.last_model.lock() = Some(model_id.to_string());
    }

    fn record_success(&self, model_id: &str) {
        // Full reset, not a decrement: a healthy response clears history.
        if let Some(mut stats) = self.stats.get_mut(model_id) {
            stats.errors = 0;
            stats.last_error = None;
        }
    }

    fn record_failure(&self, model_id: &str) {
        let mut stats = self.stats.entry(model_id.to_string()).or_default();
        // Materialize pending decay before stacking the new error.
        let decayed = stats.effective_errors(self.cooldown);
        stats.errors = decayed + 1;
        stats.last_error = Some(Instant::now());
    }

    async fn attempt(
        &self,
        model: &ModelConfig,
        messages: &[ChatMessage],
        json_response: bool,
    ) -> Result<Completion> {
        self.record_call(&model.id);
        let request = CompletionRequest {
            model: model.id.clone(),
            messages: messages.to_vec(),
            temperature: self.temperature,
            json_response,
        };
        self.client.complete(&request).await
    }

    /// Route and execute a completion request.
    ///
    /// Escalates to the sota tier when `signals` satisfy the unicorn
    /// predicate. On failure the selected model's error counter is bumped
    /// and exactly one fresh standard-tier fallback is tried; a second
    /// failure propagates to the caller, who owns further retries.
    ///
    /// # Errors
    ///
    /// [`RouterError::ModelFailed`] when no distinct fallback was
    /// available, [`RouterError::FallbackFailed`] when both attempts
    /// failed.
    pub async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        json_response: bool,
        signals: Option<&EscalationSignals>,
    ) -> Result<Completion> {
        let escalate = signals.map_or(false, Self::is_unicorn);
        let primary = if escalate {
            self.select_sota().clone()
        } else {
            self.select_standard().clone()
        };

        match self.attempt(&primary, &messages, json_response).await {
            Ok(completion) => {
                self.record_success(&primary.id);
                Ok(completion)
            }
            Err(primary_err) => {
                self.record_failure(&primary.id);
                warn!(
                    model = %primary.id,
                    error = %primary_err,
                    "Model call failed, trying fallback"
                );

                let fallback = self.select_standard().clone();
                if fallback.id == primary.id {
                    return Err(RouterError::ModelFailed {
                        model: primary.id,
                        reason: primary_err.to_string(),
                    }
                    .into());
                }

                match self.attempt(&fallback, &messages, json_response).await {
                    Ok(completion) => {
                        self.record_success(&fallback.id);
                        Ok(completion)
                    }
                    Err(fallback_err) => {
                        self.record_failure(&fallback.id);
                        Err(RouterError::FallbackFailed {
                            model: primary.id,
                            fallback: fallback.id,
                            reason: fallback_err.to_string(),
                        }
                        .into())
                    }
                }
            }
        }
    }

    /// Observable router state for the metrics surface.
    #[must_use]
    pub fn snapshot(&self) -> RouterSnapshot {
        let models = self
            .standard
            .iter()
            .chain(self.sota.iter())
            .map(|model| {
                let (calls, errors) = self
                    .stats
                    .get(&model.id)
                    .map_or((0, 0), |s| (s.calls, s.effective_errors(self.cooldown)));
                ModelCounters {
                    id: model.id.clone(),
                    calls,
                    errors,
                }
            })
            .collect();

        RouterSnapshot {
            models,
            last_model: self.last_model.lock().clone(),
            sota_calls: self.sota_calls.load(Ordering::Relaxed),
        }
    }

    /// Clear all routing history. Test isolation only; production state
    /// resets by process restart.
    pub fn reset(&self) {
        self.stats.clear();
        *self.last_model.lock() = None;
        self.sota_calls.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NeverCalled;

    #[async_trait]
    impl ChatCompletion for NeverCalled {
        fn name(&self) -> &'static str {
            "never"
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<Completion> {
            panic!("selection tests must not call the client");
        }
    }

    fn router() -> ModelRouter {
        ModelRouter::new(&RouterConfig::default(), Arc::new(NeverCalled)).unwrap()
    }

    #[test]
    fn unicorn_deep_confident_discount() {
        let signals = EscalationSignals {
            discount_percentage: 90.0,
            initial_confidence: 80.0,
            ..Default::default()
        };
        assert!(ModelRouter::is_unicorn(&signals));
    }

    #[test]
    fn unicorn_extreme_z_score() {
        let signals = EscalationSignals {
            z_score: 5.0,
            ..Default::default()
        };
        assert!(ModelRouter::is_unicorn(&signals));
    }

    #[test]
    fn unicorn_expensive_item_with_deep_discount() {
        let signals = EscalationSignals {
            original_price: 600.0,
            discount_percentage: 75.0,
            price: 150.0,
            ..Default::default()
        };
        assert!(ModelRouter::is_unicorn(&signals));
    }

    #[test]
    fn unicorn_decimal_error_type() {
        let signals = EscalationSignals {
            anomaly_type: Some(AnomalyType::DecimalError),
            ..Default::default()
        };
        assert!(ModelRouter::is_unicorn(&signals));
    }

    #[test]
    fn unicorn_decimal_ratio_signature() {
        let signals = EscalationSignals {
            original_price: 200.0,
            price: 19.99,
            ..Default::default()
        };
        assert!(ModelRouter::is_unicorn(&signals));

        let inverted = EscalationSignals {
            original_price: 2.0,
            price: 20.0,
            ..Default::default()
        };
        assert!(ModelRouter::is_unicorn(&inverted));
    }

    #[test]
    fn shallow_discount_is_not_a_unicorn() {
        let signals = EscalationSignals {
            discount_percentage: 40.0,
            ..Default::default()
        };
        assert!(!ModelRouter::is_unicorn(&signals));
    }

    #[test]
    fn unicorn_predicate_ignores_missing_prices() {
        // Zero prices must not trip the ratio clause.
        assert!(!ModelRouter::is_unicorn(&EscalationSignals::default()));
    }

    #[test]
    fn sota_selection_counts_and_standard_does_not() {
        let router = router();
        router.select_sota();
        router.select_sota();
        router.select_standard();

        assert_eq!(router.snapshot().sota_calls, 2);
    }

    #[test]
    fn empty_sota_tier_falls_back_to_standard() {
        let config = RouterConfig {
            models: vec![ModelConfig {
                id: "only/standard".into(),
                weight: 1,
                tier: ModelTier::Standard,
                input_cost_per_mtok: 0.0,
                output_cost_per_mtok: 0.0,
            }],
            ..Default::default()
        };
        let router = ModelRouter::new(&config, Arc::new(NeverCalled)).unwrap();
        assert_eq!(router.select_sota().id, "only/standard");
        assert_eq!(router.snapshot().sota_calls, 0);
    }

    #[test]
    fn standard_only_catalog_required() {
        let config = RouterConfig {
            models: vec![ModelConfig {
                id: "only/sota".into(),
                weight: 1,
                tier: ModelTier::Sota,
                input_cost_per_mtok: 0.0,
                output_cost_per_mtok: 0.0,
            }],
            ..Default::default()
        };
        assert!(ModelRouter::new(&config, Arc::new(NeverCalled)).is_err());
    }

    #[test]
    fn error_decay_forgives_after_cooldown() {
        let mut stats = ModelStats {
            calls: 0,
            errors: 3,
            last_error: Some(Instant::now() - Duration::from_secs(120)),
        };

        assert_eq!(stats.effective_errors(Duration::from_secs(300)), 3);
        assert_eq!(stats.effective_errors(Duration::from_secs(60)), 1);
        assert_eq!(stats.effective_errors(Duration::from_secs(30)), 0);

        stats.errors = 0;
        assert_eq!(stats.effective_errors(Duration::from_secs(30)), 0);
    }

    #[tokio::test]
    async fn reset_clears_history() {
        struct AlwaysOk;

        #[async_trait]
        impl ChatCompletion for AlwaysOk {
            fn name(&self) -> &'static str {
                "ok"
            }

            async fn complete(&self, _request: &CompletionRequest) -> Result<Completion> {
                Ok(Completion {
                    content: "ok".into(),
                    usage: Default::default(),
                })
            }
        }

        let router = ModelRouter::new(&RouterConfig::default(), Arc::new(AlwaysOk)).unwrap();

        router
            .complete(vec![ChatMessage::user("hi")], false, None)
            .await
            .unwrap();
        assert!(router.snapshot().models.iter().any(|m| m.calls > 0));

        router.reset();
        let snapshot = router.snapshot();
        assert!(snapshot.models.iter().all(|m| m.calls == 0 && m.errors == 0));
        assert_eq!(snapshot.last_model, None);
        assert_eq!(snapshot.sota_calls, 0);
    }
}
