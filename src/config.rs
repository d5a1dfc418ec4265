//! Configuration loading from TOML files.
//!
//! Every section has serde defaults so a minimal file runs the pipeline
//! against sensible settings; [`Config::validate`] enforces the invariants
//! that must hold before startup. Missing required configuration refuses to
//! start the process; there is no degraded mode.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::Subscriber;
use crate::error::{ConfigError, Result};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub streams: StreamsConfig,

    /// Detection-validation stage consumer.
    #[serde(default = "ConsumerSettings::validation_defaults")]
    pub validation: ConsumerSettings,

    /// Confirmation-notification stage consumer.
    #[serde(default = "ConsumerSettings::notification_defaults")]
    pub notification: ConsumerSettings,

    #[serde(default)]
    pub dedup: DedupConfig,

    #[serde(default)]
    pub router: RouterConfig,

    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Subscriber roster for the built-in static directory. Deployments
    /// with an external account store leave this empty and wire their own
    /// [`SubscriberDirectory`](crate::port::SubscriberDirectory).
    #[serde(default)]
    pub subscribers: Vec<Subscriber>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            streams: StreamsConfig::default(),
            validation: ConsumerSettings::validation_defaults(),
            notification: ConsumerSettings::notification_defaults(),
            dedup: DedupConfig::default(),
            router: RouterConfig::default(),
            channels: ChannelsConfig::default(),
            subscribers: Vec::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LoggingConfig {
    /// Initialize the tracing subscriber with this logging configuration.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

/// Stream topic names.
#[derive(Debug, Deserialize)]
pub struct StreamsConfig {
    #[serde(default = "default_detected_stream")]
    pub detected: String,
    #[serde(default = "default_confirmed_stream")]
    pub confirmed: String,
}

fn default_detected_stream() -> String {
    "glitch:detected".into()
}

fn default_confirmed_stream() -> String {
    "glitch:confirmed".into()
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            detected: default_detected_stream(),
            confirmed: default_confirmed_stream(),
        }
    }
}

/// Per-stage stream consumer settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsumerSettings {
    /// Cursor key; exclusively owned by one consumer instance.
    pub cursor_key: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_batch_size() -> usize {
    10
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_max_retries() -> u32 {
    5
}

impl ConsumerSettings {
    fn validation_defaults() -> Self {
        Self {
            cursor_key: "cursor:validation".into(),
            batch_size: default_batch_size(),
            poll_interval_ms: default_poll_interval_ms(),
            max_retries: default_max_retries(),
        }
    }

    fn notification_defaults() -> Self {
        Self {
            cursor_key: "cursor:notification".into(),
            batch_size: default_batch_size(),
            poll_interval_ms: default_poll_interval_ms(),
            max_retries: default_max_retries(),
        }
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Notification dedup settings.
#[derive(Debug, Deserialize)]
pub struct DedupConfig {
    /// Time-boxed marker lifetime; within it a glitch id is notified once.
    #[serde(default = "default_dedup_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_dedup_ttl_secs() -> u64 {
    86_400
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_dedup_ttl_secs(),
        }
    }
}

impl DedupConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Model catalog tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Cheap or free models taking the bulk of validation traffic.
    Standard,
    /// Premium models reserved for high-value escalations.
    Sota,
}

/// One model in the static catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub id: String,
    /// Relative selection weight within the tier; must be positive.
    pub weight: u32,
    pub tier: ModelTier,
    #[serde(default)]
    pub input_cost_per_mtok: f64,
    #[serde(default)]
    pub output_cost_per_mtok: f64,
}

/// Chat-completion endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}

fn default_llm_timeout_ms() -> u64 {
    30_000
}

const fn default_max_tokens() -> usize {
    1_024
}

impl Default for LlmApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_ms: default_llm_timeout_ms(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Model router configuration.
#[derive(Debug, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub api: LlmApiConfig,

    /// Cooldown after which one recorded model error is forgiven.
    #[serde(default = "default_error_cooldown_secs")]
    pub error_cooldown_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_catalog")]
    pub models: Vec<ModelConfig>,
}

fn default_error_cooldown_secs() -> u64 {
    300
}

fn default_temperature() -> f64 {
    0.1
}

fn default_catalog() -> Vec<ModelConfig> {
    vec![
        ModelConfig {
            id: "meta-llama/llama-3.3-70b-instruct".into(),
            weight: 15,
            tier: ModelTier::Standard,
            input_cost_per_mtok: 0.0,
            output_cost_per_mtok: 0.0,
        },
        ModelConfig {
            id: "google/gemini-2.0-flash-001".into(),
            weight: 14,
            tier: ModelTier::Standard,
            input_cost_per_mtok: 0.1,
            output_cost_per_mtok: 0.4,
        },
        ModelConfig {
            id: "openai/gpt-4o-mini".into(),
            weight: 13,
            tier: ModelTier::Standard,
            input_cost_per_mtok: 0.15,
            output_cost_per_mtok: 0.6,
        },
        ModelConfig {
            id: "anthropic/claude-sonnet-4".into(),
            weight: 10,
            tier: ModelTier::Sota,
            input_cost_per_mtok: 3.0,
            output_cost_per_mtok: 15.0,
        },
        ModelConfig {
            id: "openai/gpt-4o".into(),
            weight: 8,
            tier: ModelTier::Sota,
            input_cost_per_mtok: 2.5,
            output_cost_per_mtok: 10.0,
        },
    ]
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            api: LlmApiConfig::default(),
            error_cooldown_secs: default_error_cooldown_secs(),
            temperature: default_temperature(),
            models: default_catalog(),
        }
    }
}

impl RouterConfig {
    #[must_use]
    pub fn error_cooldown(&self) -> Duration {
        Duration::from_secs(self.error_cooldown_secs)
    }
}

/// Notification channel adapters.
#[derive(Debug, Default, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub webhook: Option<WebhookChannelConfig>,
}

/// Chat-webhook channel settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookChannelConfig {
    #[serde(default = "default_webhook_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_webhook_timeout_ms() -> u64 {
    10_000
}

impl Config {
    /// Load and validate a config file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for unreadable files, parse failures, or
    /// invariant violations. Callers treat all of these as fatal.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants that serde defaults cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] or
    /// [`ConfigError::MissingField`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.streams.detected.is_empty() {
            return Err(ConfigError::MissingField {
                field: "streams.detected",
            }
            .into());
        }
        if self.streams.confirmed.is_empty() {
            return Err(ConfigError::MissingField {
                field: "streams.confirmed",
            }
            .into());
        }

        for (name, consumer) in [
            ("validation", &self.validation),
            ("notification", &self.notification),
        ] {
            if consumer.cursor_key.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "cursor_key",
                    reason: format!("{name} consumer cursor_key cannot be empty"),
                }
                .into());
            }
            if consumer.batch_size == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "batch_size",
                    reason: format!("{name} consumer batch_size must be positive"),
                }
                .into());
            }
            if consumer.max_retries == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "max_retries",
                    reason: format!("{name} consumer max_retries must be positive"),
                }
                .into());
            }
        }

        if self.validation.cursor_key == self.notification.cursor_key {
            return Err(ConfigError::InvalidValue {
                field: "cursor_key",
                reason: "stages must not share a cursor key".into(),
            }
            .into());
        }

        if self.router.models.is_empty() {
            return Err(ConfigError::MissingField {
                field: "router.models",
            }
            .into());
        }
        if !self
            .router
            .models
            .iter()
            .any(|m| m.tier == ModelTier::Standard)
        {
            return Err(ConfigError::InvalidValue {
                field: "router.models",
                reason: "catalog needs at least one standard-tier model".into(),
            }
            .into());
        }
        for model in &self.router.models {
            if model.weight == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "router.models.weight",
                    reason: format!("model '{}' has zero weight", model.id),
                }
                .into());
            }
        }

        url::Url::parse(&self.router.api.base_url).map_err(|e| ConfigError::InvalidValue {
            field: "router.api.base_url",
            reason: e.to_string(),
        })?;

        for subscriber in &self.subscribers {
            if let Some(webhook) = &subscriber.targets.webhook_url {
                url::Url::parse(webhook).map_err(|e| ConfigError::InvalidValue {
                    field: "subscribers.targets.webhook_url",
                    reason: format!("subscriber '{}': {e}", subscriber.id),
                })?;
            }
        }

        Ok(())
    }
}
