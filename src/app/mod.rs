//! Pipeline wiring and application entry point.
//!
//! [`Pipeline`] assembles the two consumer stages over one broker handle;
//! [`App::run`] hosts them until a shutdown signal. Every component can be
//! swapped through the builder, which is how tests inject scripted
//! validators and recording channels.

pub mod consumer;
pub mod metrics;
pub mod notify;
pub mod producer;
pub mod router;
pub mod validation;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::adapter::broker::MemoryBroker;
use crate::adapter::directory::StaticDirectory;
use crate::adapter::llm::OpenAiCompatible;
use crate::adapter::channel::WebhookChannel;
use crate::config::Config;
use crate::error::Result;
use crate::port::broker::Broker;
use crate::port::channel::NotificationChannel;
use crate::port::directory::SubscriberDirectory;
use crate::port::validator::GlitchValidator;

use consumer::{ConsumerConfig, StreamConsumer};
use metrics::MetricsReport;
use notify::{GlitchNotifier, NotificationHandler};
use producer::DetectionProducer;
use router::ModelRouter;
use validation::{LlmValidator, ValidationHandler};

/// Builder over [`Config`] with injectable components.
pub struct PipelineBuilder {
    config: Config,
    broker: Option<Arc<dyn Broker>>,
    validator: Option<Arc<dyn GlitchValidator>>,
    directory: Option<Arc<dyn SubscriberDirectory>>,
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl PipelineBuilder {
    fn new(config: Config) -> Self {
        Self {
            config,
            broker: None,
            validator: None,
            directory: None,
            channels: Vec::new(),
        }
    }

    /// Use an external broker instead of the in-process default.
    #[must_use]
    pub fn broker(mut self, broker: Arc<dyn Broker>) -> Self {
        self.broker = Some(broker);
        self
    }

    /// Replace the LLM-backed validator (skips router construction).
    #[must_use]
    pub fn validator(mut self, validator: Arc<dyn GlitchValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Replace the config-file subscriber roster.
    #[must_use]
    pub fn directory(mut self, directory: Arc<dyn SubscriberDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Add a notification channel; suppresses the config-derived set.
    #[must_use]
    pub fn channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    /// Assemble the pipeline.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration, missing API keys, or an unusable
    /// model catalog, all of which are fatal startup conditions.
    pub fn build(self) -> Result<Pipeline> {
        self.config.validate()?;

        let broker = self
            .broker
            .unwrap_or_else(|| Arc::new(MemoryBroker::new()) as Arc<dyn Broker>);

        let (router, validator) = match self.validator {
            Some(validator) => (None, validator),
            None => {
                let client = Arc::new(OpenAiCompatible::from_config(&self.config.router.api)?);
                let router = Arc::new(ModelRouter::new(&self.config.router, client)?);
                let validator: Arc<dyn GlitchValidator> =
                    Arc::new(LlmValidator::new(Arc::clone(&router)));
                (Some(router), validator)
            }
        };

        let channels = if self.channels.is_empty() {
            configured_channels(&self.config)?
        } else {
            self.channels
        };
        if channels.is_empty() {
            warn!("No notification channels configured; confirmed glitches will go nowhere");
        }

        let directory = self.directory.unwrap_or_else(|| {
            Arc::new(StaticDirectory::new(self.config.subscribers.clone()))
                as Arc<dyn SubscriberDirectory>
        });

        let notifier = Arc::new(GlitchNotifier::new(
            Arc::clone(&broker),
            directory,
            channels,
            self.config.dedup.ttl(),
        ));

        let validation = StreamConsumer::new(
            Arc::clone(&broker),
            Arc::new(ValidationHandler::new(
                Arc::clone(&broker),
                validator,
                self.config.streams.confirmed.clone(),
            )),
            ConsumerConfig::from_settings(
                "validation",
                &self.config.streams.detected,
                &self.config.validation,
            ),
        );

        let notification = StreamConsumer::new(
            Arc::clone(&broker),
            Arc::new(NotificationHandler::new(notifier)),
            ConsumerConfig::from_settings(
                "notification",
                &self.config.streams.confirmed,
                &self.config.notification,
            ),
        );

        let producer = DetectionProducer::new(
            Arc::clone(&broker),
            self.config.streams.detected.clone(),
        );

        let streams = vec![
            self.config.streams.detected.clone(),
            self.config.streams.confirmed.clone(),
        ];

        Ok(Pipeline {
            broker,
            router,
            producer,
            validation,
            notification,
            streams,
        })
    }
}

/// Channel set derived from config and environment.
fn configured_channels(config: &Config) -> Result<Vec<Arc<dyn NotificationChannel>>> {
    let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();

    if let Some(webhook) = &config.channels.webhook {
        channels.push(Arc::new(WebhookChannel::new(webhook)?));
    }

    #[cfg(feature = "telegram")]
    if let Some(telegram) = crate::adapter::channel::TelegramChannel::from_env() {
        channels.push(Arc::new(telegram));
    }

    Ok(channels)
}

/// Fully wired but not yet running pipeline.
pub struct Pipeline {
    broker: Arc<dyn Broker>,
    router: Option<Arc<ModelRouter>>,
    producer: DetectionProducer,
    validation: StreamConsumer,
    notification: StreamConsumer,
    streams: Vec<String>,
}

impl Pipeline {
    #[must_use]
    pub fn builder(config: Config) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    /// Spawn both consumer stages on the runtime.
    #[must_use]
    pub fn spawn(self) -> PipelineHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tasks = vec![
            tokio::spawn(self.validation.run(shutdown_rx.clone())),
            tokio::spawn(self.notification.run(shutdown_rx)),
        ];

        PipelineHandle {
            broker: self.broker,
            router: self.router,
            producer: self.producer,
            streams: self.streams,
            shutdown: shutdown_tx,
            tasks,
        }
    }
}

/// Control handle over a running pipeline.
pub struct PipelineHandle {
    broker: Arc<dyn Broker>,
    router: Option<Arc<ModelRouter>>,
    producer: DetectionProducer,
    streams: Vec<String>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl PipelineHandle {
    /// Entry point for the scraping collaborator.
    #[must_use]
    pub fn producer(&self) -> &DetectionProducer {
        &self.producer
    }

    /// The broker handle shared by both stages.
    #[must_use]
    pub fn broker(&self) -> Arc<dyn Broker> {
        Arc::clone(&self.broker)
    }

    /// Router state, when the LLM-backed validator is wired.
    #[must_use]
    pub fn router(&self) -> Option<Arc<ModelRouter>> {
        self.router.clone()
    }

    /// Current pipeline counters for an external poller.
    ///
    /// # Errors
    ///
    /// Propagates broker failures.
    pub async fn metrics(&self) -> Result<MetricsReport> {
        MetricsReport::gather(self.router.as_deref(), self.broker.as_ref(), &self.streams).await
    }

    /// Signal shutdown and wait for both stages to drain.
    ///
    /// Consumers observe the signal at their poll-sleep boundary, so the
    /// in-flight entry finishes before the tasks resolve.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Application entry point for the `run` command.
pub struct App;

impl App {
    /// Run the pipeline until a Ctrl-C signal, then drain gracefully.
    ///
    /// # Errors
    ///
    /// Returns startup errors (config, catalog, API keys); runtime
    /// data-level errors never surface here; they land in the DLQ.
    pub async fn run(config: Config) -> Result<()> {
        let handle = Pipeline::builder(config).build()?.spawn();
        info!("Pipeline running");

        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received");

        handle.shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{RecordingChannel, ScriptedValidator};

    #[tokio::test]
    async fn builder_wires_scripted_components() {
        let pipeline = Pipeline::builder(Config::default())
            .validator(Arc::new(ScriptedValidator::confirming()))
            .channel(Arc::new(RecordingChannel::new("webhook")))
            .build()
            .unwrap();

        assert!(pipeline.router.is_none());

        let handle = pipeline.spawn();
        let report = handle.metrics().await.unwrap();
        assert_eq!(report.dead_letters.len(), 2);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn invalid_config_fails_fast() {
        let mut config = Config::default();
        config.router.models.clear();

        let result = Pipeline::builder(config)
            .validator(Arc::new(ScriptedValidator::confirming()))
            .build();
        assert!(result.is_err());
    }
}
