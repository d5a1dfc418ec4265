//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`chat`] — Scripted [`ChatCompletion`](crate::port::ChatCompletion) mock.
//! - [`channel`] — Recording [`NotificationChannel`](crate::port::NotificationChannel).
//! - [`handler`] — Flaky/selective consumer entry handlers.
//! - [`validator`] — Scripted glitch validators.
//! - [`fixtures`] — Builders for observations, glitches, subscribers.

pub mod channel;
pub mod chat;
pub mod fixtures;
pub mod handler;
pub mod validator;

pub use channel::RecordingChannel;
pub use chat::ScriptedChat;
pub use fixtures::{
    detected_anomaly, glitch, glitched_observation, stable_history, subscriber,
};
pub use handler::{FlakyHandler, SelectiveHandler};
pub use validator::ScriptedValidator;
