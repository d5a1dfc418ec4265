//! Subscriber directory port.
//!
//! Subscriber records live with an external collaborator (billing and
//! account storage); the core only needs the realtime roster to gate
//! fan-out.

use async_trait::async_trait;

use crate::domain::Subscriber;
use crate::error::Result;

/// Read-side contract for the subscriber roster.
#[async_trait]
pub trait SubscriberDirectory: Send + Sync {
    /// All subscribers whose plans include realtime notifications.
    /// Preference filtering happens in the fan-out, not here.
    async fn realtime_subscribers(&self) -> Result<Vec<Subscriber>>;
}
