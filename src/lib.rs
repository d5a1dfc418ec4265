//! Glitchwatch - price-glitch detection, validation, and notification.
//!
//! This crate ingests scraped product-price observations, flags
//! statistically anomalous price drops, escalates ambiguous cases to a
//! cost-tiered AI-model router for confirmation, and fans confirmed
//! glitches out to subscriber notification channels.
//!
//! # Architecture
//!
//! Two durable stream stages connected by broker topics:
//!
//! ```text
//! observation -> detect -> [glitch:detected] -> validate -> [glitch:confirmed] -> notify
//! ```
//!
//! - **`domain`** - Pure detection statistics and pipeline payloads
//!   - `stats` - median, medcouple, double-MAD, skew-adjusted IQR
//!   - `detection` - the anomaly classifier and confidence scoring
//! - **`app::consumer`** - Generic at-least-once consumer: ordered,
//!   retry-bounded, dead-letter fallback
//! - **`app::router`** - Weighted model selection, circuit breaking,
//!   unicorn escalation to the sota tier
//! - **`app::notify`** - Dedup gate and settle-all channel fan-out
//! - **`port`** / **`adapter`** - Trait seams and the bundled
//!   implementations (in-memory broker, OpenAI-compatible client,
//!   webhook/Telegram channels)
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files
//! - [`domain`] - Broker-agnostic types and pure detection logic
//! - [`error`] - Error types for the crate
//! - [`port`] - Trait definitions for external collaborators
//! - [`adapter`] - Bundled port implementations
//! - [`app`] - Pipeline wiring and the two consumer stages
//! - [`cli`] - Command-line interface
//!
//! # Features
//!
//! - `telegram` - Enable the Telegram notification channel
//! - `testkit` - Expose scripted mocks to integration tests
//!
//! # Example
//!
//! ```no_run
//! use glitchwatch::app::Pipeline;
//! use glitchwatch::config::Config;
//!
//! # async fn example() -> glitchwatch::error::Result<()> {
//! let pipeline = Pipeline::builder(Config::default()).build()?;
//! let handle = pipeline.spawn();
//! // feed observations through handle.producer()
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
