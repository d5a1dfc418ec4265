//! Subscriber directory adapters.

use async_trait::async_trait;

use crate::domain::Subscriber;
use crate::error::Result;
use crate::port::directory::SubscriberDirectory;

/// Fixed roster loaded at startup (config file or test fixture).
/// Deployments with a live account store implement the port against it.
pub struct StaticDirectory {
    subscribers: Vec<Subscriber>,
}

impl StaticDirectory {
    #[must_use]
    pub fn new(subscribers: Vec<Subscriber>) -> Self {
        Self { subscribers }
    }
}

#[async_trait]
impl SubscriberDirectory for StaticDirectory {
    async fn realtime_subscribers(&self) -> Result<Vec<Subscriber>> {
        Ok(self
            .subscribers
            .iter()
            .filter(|s| s.active && s.realtime)
            .cloned()
            .collect())
    }
}
